//! Device location acquisition for the home-physiotherapy booking app.
//!
//! The pipeline turns "where am I?" into a [`models::LocationData`]:
//! permission, then coordinates ([`acquirer`]), then an address
//! ([`resolver`]), all orchestrated by the status-tracking
//! [`state::LocationStateMachine`]. The [`picker`] offers a manual
//! alternative on top of place search ([`places`]).
//!
//! External collaborators sit behind traits in [`platform`] and [`api`];
//! [`location`] and [`api::GoogleMapsClient`] are the desktop implementations
//! used by the terminal front-end ([`app`], [`events`], [`ui`]).

pub mod acquirer;
pub mod api;
pub mod app;
pub mod config;
pub mod db;
pub mod error;
pub mod events;
pub mod location;
pub mod logging;
pub mod models;
pub mod picker;
pub mod places;
pub mod platform;
pub mod resolver;
pub mod state;
pub mod ui;
