pub mod server;

use crate::api::handlers::auth::AuthConfig;

#[derive(Debug)]
pub enum Action {
    Server {
        port: u16,
        redis_url: String,
        config: AuthConfig,
    },
}
