mod handlers;
mod main_menu;
mod session;
mod thumbnail_view;
mod timeline_view;

pub use main_menu::show_main_menu;
pub use session::PreviewSession;
pub use timeline_view::{TerminalTimelineObserver, TimelineOutcome, format_timestamp};
