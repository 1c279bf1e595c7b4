//! Supervised background tasks.

use futures::FutureExt;
use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use tokio::task::JoinHandle;
use tracing::{debug, error};

/// Spawns `future` on the runtime and captures any panic it raises.
///
/// A panic is logged with the task name and the handle resolves to `None`;
/// the host process and the awaiting task keep running.
pub fn spawn_supervised<F, T>(name: &'static str, future: F) -> JoinHandle<Option<T>>
where
    F: Future<Output = T> + Send + 'static,
    T: Send + 'static,
{
    tokio::spawn(async move {
        debug!(task = name, "Task started");
        match AssertUnwindSafe(future).catch_unwind().await {
            Ok(value) => {
                debug!(task = name, "Task finished");
                Some(value)
            }
            Err(panic) => {
                error!(task = name, panic = %panic_message(&*panic), "Recovered from task panic");
                None
            }
        }
    })
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
