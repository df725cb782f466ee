//! The standard event handlers.
//!
//! | Tag | Handler |
//! |---|---|
//! | `OnDuty:update` | [`OnDutyHandler`] |
//! | `welcome` | [`WelcomeHandler`] |
//! | `FriendRequest:update`, `WingRequest:update`, `SysArrived:update`, `BeaconSpotted:update`, `InstanceSuccessful:update`, `Fueled:update` | [`ToggleHandler`] |
//! | `CallJumps:update` | [`CallJumpsHandler`] |
//! | `ClientSystem:update` | [`ClientSystemHandler`] |
//! | `authorization` | [`AuthorizationHandler`] |

mod jumps;
mod session;
mod system;
mod toggle;

pub use jumps::{CallJumpsHandler, truncate_lightyears};
pub use session::{AuthorizationHandler, OnDutyHandler, WelcomeHandler};
pub use system::ClientSystemHandler;
pub use toggle::ToggleHandler;
