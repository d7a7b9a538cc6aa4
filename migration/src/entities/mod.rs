pub mod shortlink;
pub mod shortlink_click;

pub use shortlink::Entity as ShortlinkEntity;
pub use shortlink_click::Entity as ShortlinkClickEntity;
