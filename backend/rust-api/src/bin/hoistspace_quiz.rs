use std::io::Write;
use std::sync::Arc;

use hoistspace_api::config::Config;
use hoistspace_api::presentation::{parse_command, render, Command};
use hoistspace_api::services::explanation_client::ExplanationClient;
use hoistspace_api::services::identity::{FileKeyValueStore, IdentityProvider};
use hoistspace_api::services::question_source::QuestionSource;
use hoistspace_api::services::quiz_controller::QuizController;
use hoistspace_api::services::quiz_store::MongoQuizStore;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    // Logs go to stderr so they never interleave with the quiz screen
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "hoistspace_api=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let settings = match Config::load().and_then(|config| config.client_settings()) {
        Ok(settings) => settings,
        Err(e) => {
            tracing::error!("Refusing to start: {}", e);
            return Err(e.into());
        }
    };

    let storage = FileKeyValueStore::new(&settings.storage_path);
    tracing::debug!("Local storage at {}", storage.path().display());
    let identity = IdentityProvider::new(Arc::new(storage));
    let user_id = identity.get_or_create_user_id();

    let store =
        Arc::new(MongoQuizStore::connect(&settings.store_uri, &settings.store_database).await?);
    let explainer = Arc::new(ExplanationClient::new(
        &settings.explain_url,
        settings.api_key.clone(),
    ));

    let mut controller =
        QuizController::new(user_id, QuestionSource::new(store.clone()), store, explainer);

    show(&render(&controller.view()))?;
    controller.start().await;
    show(&render(&controller.view()))?;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        match parse_command(&line) {
            Command::Quit => break,
            Command::Skip => controller.skip().await,
            Command::Next => controller.next_question().await,
            Command::Why => {
                if !controller.open_explanation() {
                    show("Submit an answer first.\n")?;
                    continue;
                }
            }
            Command::Ai => {
                if let Some(request) = controller.begin_ai_explanation() {
                    show(&render(&controller.view()))?;
                    let explanation = controller
                        .explainer()
                        .request_ai_explanation(&request.code, &request.correct_output)
                        .await;
                    controller.finish_ai_explanation(&request, explanation);
                }
            }
            Command::Close => controller.close_explanation(),
            Command::Answer(answer) => {
                controller.set_answer(answer);
                controller.submit();
            }
            Command::Unknown(command) => {
                show(&format!("Unknown command {}\n", command))?;
                continue;
            }
        }
        show(&render(&controller.view()))?;
    }

    tracing::info!(
        "Session finished with score {}/{}",
        controller.quiz().score(),
        controller.quiz().total_attempts()
    );
    Ok(())
}

fn show(text: &str) -> std::io::Result<()> {
    let mut stdout = std::io::stdout().lock();
    stdout.write_all(text.as_bytes())?;
    stdout.write_all(b"> ")?;
    stdout.flush()
}
