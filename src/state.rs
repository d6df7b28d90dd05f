use std::sync::Arc;

use crate::config::Config;
use crate::routes::tasks::TaskService;

#[derive(Clone)]
pub struct AppState {
    pub tasks: TaskService,
    pub config: Arc<Config>,
}
