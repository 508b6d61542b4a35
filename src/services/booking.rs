//! Booking workflow: creating, listing and cancelling seat bookings.
//!
//! A seat of a show belongs to at most one booking. The check-and-claim itself
//! is done by the store in one transaction; this module validates the request
//! and the caller's right to act on the booking before that.

use std::collections::HashSet;
use tracing::info;

use crate::error::{AppError, AppResult};
use crate::middleware::{may_access, AuthUser};
use crate::models::{
    BookingCreated, BookingDetails, CreateBookingRequest, MessageResponse, NewBooking, SeatAvailability,
};
use crate::AppState;

/// Every seat must be in `1..=capacity` and appear only once.
pub fn validate_seats(seats: &[i32], capacity: i32) -> AppResult<()> {
    if seats.is_empty() {
        return Err(AppError::Validation("select at least one seat".to_string()));
    }

    let mut seen = HashSet::with_capacity(seats.len());
    for &seat in seats {
        if !(1..=capacity).contains(&seat) {
            return Err(AppError::Validation(format!(
                "seat {seat} is outside the hall (1-{capacity})"
            )));
        }
        if !seen.insert(seat) {
            return Err(AppError::Validation(format!("seat {seat} is selected twice")));
        }
    }
    Ok(())
}

pub async fn create_booking(
    state: &AppState,
    user: &AuthUser,
    req: CreateBookingRequest,
) -> AppResult<BookingCreated> {
    validate_seats(&req.selected_seats, state.config.booking.seats_per_show)?;

    let account = user.account(state).await?;
    if !may_access(&account, req.user_id) {
        return Err(AppError::Forbidden("Cannot book for another user".to_string()));
    }

    let show = state
        .store
        .find_show(req.show_id)
        .await?
        .ok_or_else(|| AppError::not_found("Show"))?;
    if state.store.find_theatre(req.theatre_id).await?.is_none() {
        return Err(AppError::not_found("Theatre"));
    }
    if show.theatre_id != req.theatre_id {
        return Err(AppError::Validation("Show does not belong to this theatre".to_string()));
    }
    if show.tmdb_id != req.tmdb_id {
        return Err(AppError::Validation("Show is for a different movie".to_string()));
    }

    let booking = state.store.create_booking(NewBooking::from(req)).await?;
    info!(
        booking_id = booking.booking_id,
        user_id = booking.user_id,
        show_id = booking.show_id,
        seats = ?booking.seats,
        "booking created"
    );

    Ok(BookingCreated {
        success: true,
        message: "Booking successful".to_string(),
        booking_id: booking.booking_id,
    })
}

pub async fn list_bookings_for_user(
    state: &AppState,
    user: &AuthUser,
    user_id: i64,
) -> AppResult<Vec<BookingDetails>> {
    if !may_access(&user.account(state).await?, user_id) {
        return Err(AppError::Forbidden("Cannot view bookings of another user".to_string()));
    }
    Ok(state.store.bookings_for_user(user_id).await?)
}

pub async fn delete_booking(state: &AppState, user: &AuthUser, booking_id: i64) -> AppResult<MessageResponse> {
    let booking = state
        .store
        .find_booking(booking_id)
        .await?
        .ok_or_else(|| AppError::not_found("Booking"))?;

    if !may_access(&user.account(state).await?, booking.user_id) {
        return Err(AppError::Forbidden("Cannot cancel a booking of another user".to_string()));
    }

    // Может исчезнуть между find и delete
    if !state.store.delete_booking(booking_id).await? {
        return Err(AppError::not_found("Booking"));
    }

    info!(booking_id, user_id = user.id(), "booking cancelled");
    Ok(MessageResponse::ok("Booking cancelled"))
}

pub async fn seat_availability(state: &AppState, show_id: i64) -> AppResult<SeatAvailability> {
    if state.store.find_show(show_id).await?.is_none() {
        return Err(AppError::not_found("Show"));
    }

    Ok(SeatAvailability {
        show_id,
        capacity: state.config.booking.seats_per_show,
        booked: state.store.claimed_seats(show_id).await?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn rejects_out_of_range_and_duplicate_seats() {
        assert!(validate_seats(&[1, 25], 25).is_ok());
        assert!(validate_seats(&[], 25).is_err());
        assert!(validate_seats(&[0], 25).is_err());
        assert!(validate_seats(&[26], 25).is_err());
        assert!(validate_seats(&[-3], 25).is_err());
        assert!(validate_seats(&[4, 7, 4], 25).is_err());
    }

    proptest! {
        #[test]
        fn distinct_in_range_seats_are_accepted(
            seats in proptest::sample::subsequence((1..=25).collect::<Vec<i32>>(), 1..=25)
                .prop_shuffle()
        ) {
            prop_assert!(validate_seats(&seats, 25).is_ok());
        }

        #[test]
        fn any_seat_outside_the_hall_is_rejected(
            mut seats in proptest::collection::vec(1..=25i32, 0..5),
            bad in prop_oneof![i32::MIN..=0, 26..=i32::MAX],
            at in any::<prop::sample::Index>(),
        ) {
            let pos = at.index(seats.len() + 1);
            seats.insert(pos, bad);
            prop_assert!(validate_seats(&seats, 25).is_err());
        }

        #[test]
        fn a_repeated_seat_is_rejected(seat in 1..=25i32, others in proptest::collection::vec(1..=25i32, 0..5)) {
            let mut seats = others;
            seats.push(seat);
            seats.push(seat);
            prop_assert!(validate_seats(&seats, 25).is_err());
        }
    }
}
