pub mod messenger;
pub mod notifications;
pub mod settings;
pub mod wallet_refresher;

pub use messenger::{Messenger, NotifyError, TelegramMessenger};
pub use notifications::NotificationService;
pub use settings::{SettingsError, SettingsHandle};
pub use wallet_refresher::{refresh_batch, run_wallet_refresher, RefreshConfig, RefreshOutcome};
