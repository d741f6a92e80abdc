mod movie;
mod preference;
mod review;
mod room;

pub use movie::Movie;
pub use preference::Preference;
pub use review::Review;
pub use room::{Room, RoomWithParticipants};
