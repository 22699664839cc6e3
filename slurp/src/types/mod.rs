mod item;
mod window;

pub use item::{Item, ItemReceiver, ItemSender, item_channel};
pub use window::TimeWindow;
