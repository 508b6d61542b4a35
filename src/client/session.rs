use std::collections::BTreeSet;
use thiserror::Error;

use crate::models::{CreateBookingRequest, SeatAvailability};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("seat {0} does not exist")]
    NoSuchSeat(i32),
    #[error("seat {0} is already booked")]
    SeatBooked(i32),
    #[error("select a theatre first")]
    NoTheatre,
    #[error("select a show first")]
    NoShow,
    #[error("select at least one seat")]
    NoSeats,
}

/// One booking flow for one movie. Choosing a theatre forgets the show and
/// the seats; choosing a show forgets the seats.
#[derive(Debug, Clone)]
pub struct BookingSession {
    tmdb_id: i64,
    title: String,
    theatre_id: Option<i64>,
    show_id: Option<i64>,
    capacity: i32,
    booked: BTreeSet<i32>,
    selected: BTreeSet<i32>,
}

impl BookingSession {
    pub fn new(tmdb_id: i64, title: impl Into<String>) -> Self {
        Self {
            tmdb_id,
            title: title.into(),
            theatre_id: None,
            show_id: None,
            capacity: 0,
            booked: BTreeSet::new(),
            selected: BTreeSet::new(),
        }
    }

    pub fn tmdb_id(&self) -> i64 {
        self.tmdb_id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn theatre_id(&self) -> Option<i64> {
        self.theatre_id
    }

    pub fn show_id(&self) -> Option<i64> {
        self.show_id
    }

    /// Seats in the hall of the selected show, 0 before a show is chosen.
    pub fn capacity(&self) -> i32 {
        self.capacity
    }

    pub fn select_theatre(&mut self, theatre_id: i64) {
        self.theatre_id = Some(theatre_id);
        self.show_id = None;
        self.capacity = 0;
        self.booked.clear();
        self.selected.clear();
    }

    pub fn select_show(&mut self, seats: &SeatAvailability) -> Result<(), SessionError> {
        if self.theatre_id.is_none() {
            return Err(SessionError::NoTheatre);
        }
        self.show_id = Some(seats.show_id);
        self.capacity = seats.capacity;
        self.booked = seats.booked.iter().copied().collect();
        self.selected.clear();
        Ok(())
    }

    pub fn is_booked(&self, seat: i32) -> bool {
        self.booked.contains(&seat)
    }

    pub fn is_selected(&self, seat: i32) -> bool {
        self.selected.contains(&seat)
    }

    /// Selects a free seat or deselects a selected one. Returns whether the
    /// seat is selected afterwards.
    pub fn toggle_seat(&mut self, seat: i32) -> Result<bool, SessionError> {
        if self.show_id.is_none() {
            return Err(SessionError::NoShow);
        }
        if !(1..=self.capacity).contains(&seat) {
            return Err(SessionError::NoSuchSeat(seat));
        }
        if self.booked.contains(&seat) {
            return Err(SessionError::SeatBooked(seat));
        }
        if self.selected.remove(&seat) {
            Ok(false)
        } else {
            self.selected.insert(seat);
            Ok(true)
        }
    }

    /// Selected seats, ascending.
    pub fn selected_seats(&self) -> Vec<i32> {
        self.selected.iter().copied().collect()
    }

    pub fn to_request(&self, user_id: i64) -> Result<CreateBookingRequest, SessionError> {
        let theatre_id = self.theatre_id.ok_or(SessionError::NoTheatre)?;
        let show_id = self.show_id.ok_or(SessionError::NoShow)?;
        if self.selected.is_empty() {
            return Err(SessionError::NoSeats);
        }

        Ok(CreateBookingRequest {
            user_id,
            tmdb_id: self.tmdb_id,
            theatre_id,
            show_id,
            selected_seats: self.selected_seats(),
        })
    }
}
