pub mod actions;
pub mod config;
pub mod cookie;
pub mod dispatch;
pub mod error;
pub mod search;
#[cfg(target_arch = "wasm32")]
mod browser;

pub use actions::{EntityId, EntityKind, QaAction, Target, Vote};
pub use config::{QaConfig, RequestStrategy};
pub use dispatch::{CookieJar, Dispatcher, FormPayload, Navigator, Outcome, Transport};
pub use error::{QaError, Result};

#[cfg(target_arch = "wasm32")]
pub use browser::{init_search_box, QaActions};

#[cfg(target_arch = "wasm32")]
#[wasm_bindgen::prelude::wasm_bindgen(start)]
pub fn start() {
    // Initialize console error panic hook for better error messages
    console_error_panic_hook::set_once();

    console_log::init_with_level(log::Level::Info).expect("error initializing log");

    log::info!("Starting hasker-web");
    init_search_box();
}
