pub mod category;
pub mod event;
pub mod post;
pub mod user;

pub use category::{Entity as Category, Model as CategoryModel};
pub use event::{Entity as Event, Model as EventModel};
pub use post::{Entity as Post, Model as PostModel};
pub use user::{Entity as User, Model as UserModel, NewUser};
