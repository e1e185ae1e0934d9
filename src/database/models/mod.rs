pub mod entry;
pub mod notification;
pub mod user;

pub use entry::{Entry, NewEntry};
pub use notification::{Notification, NotificationKind};
pub use user::{NewUser, Role, User, UserChanges};
