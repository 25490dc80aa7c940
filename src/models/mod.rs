pub mod bookingmodel;
pub mod listingmodel;
pub mod negotiationmodel;
pub mod notificationmodel;
pub mod usermodel;
