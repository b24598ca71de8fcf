use bitflags::bitflags;

bitflags! {
    /// Permissions granted to a contract call. A native method declares
    /// the flags it requires; the dispatcher faults when the caller's
    /// granted flags do not cover them.
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct CallFlags: u8 {
        const READ_STATES = 0b0000_0001;
        const WRITE_STATES = 0b0000_0010;
        const ALLOW_CALL = 0b0000_0100;
        const ALLOW_NOTIFY = 0b0000_1000;

        const STATES = Self::READ_STATES.bits() | Self::WRITE_STATES.bits();
        const READ_ONLY = Self::READ_STATES.bits() | Self::ALLOW_CALL.bits();
        const ALL = Self::STATES.bits()
            | Self::ALLOW_CALL.bits()
            | Self::ALLOW_NOTIFY.bits();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn composites_cover_parts() {
        assert!(CallFlags::ALL.contains(CallFlags::STATES));
        assert!(CallFlags::STATES.contains(CallFlags::READ_STATES));
        assert!(!CallFlags::READ_ONLY.contains(CallFlags::WRITE_STATES));
    }
}
