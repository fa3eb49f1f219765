pub mod room_api;

pub use room_api::RoomApiClient;
