pub mod user;
pub mod theatre;
pub mod show;
pub mod movie;
pub mod booking;
pub mod response;

pub use user::{LoginRequest, NewUser, RegisterRequest, Role, RoleUpdateRequest, User, UserSummary};
pub use theatre::{Theatre, TheatreRequest};
pub use show::{Show, ShowRequest};
pub use movie::{Movie, MovieRequest};
pub use booking::{Booking, BookingDetails, CreateBookingRequest, NewBooking, SeatAvailability, Stats};
pub use response::{AuthResponse, BookingCreated, MessageResponse, UserInfo};
