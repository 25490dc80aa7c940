pub mod bookingdb;
pub mod db;
pub mod listingdb;
#[cfg(test)]
pub mod memory;
pub mod negotiationdb;
pub mod notificationdb;
pub mod userdb;

pub use bookingdb::BookingExt;
pub use db::DBClient;
pub use listingdb::ListingExt;
pub use negotiationdb::NegotiationExt;
pub use notificationdb::NotificationExt;
pub use userdb::UserExt;
