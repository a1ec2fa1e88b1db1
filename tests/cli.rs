use assert_cmd::Command;
use predicates::prelude::*;

fn bot() -> Command {
    Command::cargo_bin("video-relay-bot").unwrap()
}

#[test]
fn help_lists_subcommands() {
    bot()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("run"))
        .stdout(predicate::str::contains("config"))
        .stdout(predicate::str::contains("check"));
}

#[test]
fn run_without_token_fails_before_connecting() {
    bot()
        .arg("run")
        .env_remove("BOT_TOKEN")
        .env_remove("YTDLP_COOKIES")
        .assert()
        .failure()
        .stderr(predicate::str::contains("BOT_TOKEN"));
}

#[test]
fn blank_token_is_rejected() {
    bot()
        .args(["run", "--token", "   "])
        .env_remove("BOT_TOKEN")
        .assert()
        .failure()
        .stderr(predicate::str::contains("BOT_TOKEN is not set"));
}

#[test]
fn token_values_are_hidden_from_help() {
    bot()
        .args(["run", "--help"])
        .env("BOT_TOKEN", "123456:secret-token")
        .assert()
        .success()
        .stdout(predicate::str::contains("secret-token").not());
}
