// ABOUTME: Defines the priority_flag octet carried by submit_sm, deliver_sm and submit_multi
// ABOUTME: Levels above 3 are reserved but preserved verbatim when decoded

use num_enum::{FromPrimitive, IntoPrimitive};

/// Priority level the originating SME assigns to a short message.
///
/// How each level maps onto network priority (GSM, ANSI-136, IS-95) is
/// decided by the SMSC.
#[derive(FromPrimitive, IntoPrimitive)]
#[repr(u8)]
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum PriorityFlag {
    /// Lowest priority, normal handling
    Level0 = 0,
    Level1 = 1,
    Level2 = 2,
    /// Highest priority
    Level3 = 3,
    #[num_enum(catch_all)]
    Reserved(u8),
}

impl Default for PriorityFlag {
    fn default() -> Self {
        PriorityFlag::Level0
    }
}
