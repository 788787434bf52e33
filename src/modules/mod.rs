pub mod chat_history;
pub mod user_sessions;

use chillpanda_kernel::settings::Settings;
use chillpanda_kernel::ModuleRegistry;

/// Register all schema modules; chat history is provisioned first
pub fn register_all(registry: &mut ModuleRegistry, settings: &Settings) {
    registry.register(chat_history::create_module(
        &settings.collections.chat_history,
    ));
    registry.register(user_sessions::create_module(
        &settings.collections.user_sessions,
    ));
}
