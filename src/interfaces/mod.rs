pub mod api;
pub mod dto;
pub mod http;
pub mod lambda;

pub use api::AppState;
pub use http::router;
pub use lambda::{ApiGatewayEvent, LambdaResponse, handle_event, handle_raw_event};
