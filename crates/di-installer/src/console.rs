use std::io::IsTerminal;

use async_trait::async_trait;
use di_core::{Console, InstallError, InstallProgress};
use dialoguer::Input;

/// Prompts with dialoguer and prints progress to stdout.
pub struct TerminalConsole;

fn read_answer(question: &str) -> Result<String, InstallError> {
    if std::io::stdin().is_terminal() {
        return Input::<String>::new()
            .with_prompt(question)
            .allow_empty(true)
            .interact_text()
            .map_err(|error| InstallError::Prompt(error.to_string()));
    }

    // Piped input: show the question and take one line.
    println!("{question}");
    let mut line = String::new();
    std::io::stdin()
        .read_line(&mut line)
        .map_err(|error| InstallError::Prompt(error.to_string()))?;
    Ok(line)
}

#[async_trait]
impl Console for TerminalConsole {
    async fn ask(&self, question: &str) -> Result<String, InstallError> {
        let question = question.to_string();
        tokio::task::spawn_blocking(move || read_answer(&question)).await?
    }

    fn report(&self, progress: &InstallProgress) {
        log::info!("{progress}");
        println!("{progress}");
    }
}
