/// Event dashboard aggregation view-model
pub mod dashboard;

/// Event creation, editing and ownership checks
pub mod event;

/// Expense mutators
pub mod expense;

/// Guest list mutators and invitation lookup
pub mod guest;

/// RSVP state machine
pub mod rsvp;

/// Task mutators
pub mod task;

/// Shared form validation rules
pub mod validation;

/// Vendor catalog, bookings and catalog filtering
pub mod vendor;
