//! Event tags carried in `meta.action`.

use std::fmt;
use std::str::FromStr;

/// Every event tag the standard router knows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventTag {
    /// A rat went on or off duty.
    OnDuty,
    /// The server greeted the connection.
    Welcome,
    /// Friend request status changed.
    FriendRequest,
    /// Wing request status changed.
    WingRequest,
    /// Rat arrived in (or left) the client's system.
    SysArrived,
    /// Client beacon spotted or lost.
    BeaconSpotted,
    /// Rat reached the client's instance.
    InstanceSuccessful,
    /// Client fueled status changed.
    Fueled,
    /// A rat called their jump count.
    CallJumps,
    /// The client's system was reported.
    ClientSystem,
    /// The server confirmed the bearer credential.
    Authorization,
}

impl EventTag {
    /// All tags, in routing table order.
    pub const ALL: [EventTag; 11] = [
        Self::OnDuty,
        Self::Welcome,
        Self::FriendRequest,
        Self::WingRequest,
        Self::SysArrived,
        Self::BeaconSpotted,
        Self::InstanceSuccessful,
        Self::Fueled,
        Self::CallJumps,
        Self::ClientSystem,
        Self::Authorization,
    ];

    /// The wire form of the tag.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::OnDuty => "OnDuty:update",
            Self::Welcome => "welcome",
            Self::FriendRequest => "FriendRequest:update",
            Self::WingRequest => "WingRequest:update",
            Self::SysArrived => "SysArrived:update",
            Self::BeaconSpotted => "BeaconSpotted:update",
            Self::InstanceSuccessful => "InstanceSuccessful:update",
            Self::Fueled => "Fueled:update",
            Self::CallJumps => "CallJumps:update",
            Self::ClientSystem => "ClientSystem:update",
            Self::Authorization => "authorization",
        }
    }
}

impl fmt::Display for EventTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error for a tag outside the standard set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownTag(pub String);

impl fmt::Display for UnknownTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown event tag '{}'", self.0)
    }
}

impl std::error::Error for UnknownTag {}

impl FromStr for EventTag {
    type Err = UnknownTag;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|tag| tag.as_str() == s)
            .ok_or_else(|| UnknownTag(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tags_parse_back() {
        for tag in EventTag::ALL {
            assert_eq!(tag.as_str().parse::<EventTag>().unwrap(), tag);
        }
    }

    #[test]
    fn test_tags_are_case_sensitive() {
        assert!("fueled:update".parse::<EventTag>().is_err());
        assert!("Authorization".parse::<EventTag>().is_err());
    }
}
