use crate::api;
use crate::cli::actions::Action;
use anyhow::Result;

/// Handle the server action
pub async fn handle(action: Action) -> Result<()> {
    match action {
        Action::Server {
            port,
            redis_url,
            config,
        } => {
            api::new(port, redis_url, config).await?;
        }
    }

    Ok(())
}
