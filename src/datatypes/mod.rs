mod command_id;
mod command_status;
mod data_coding;
mod esm_class;
mod fixed_string;
mod interface_version;
mod numeric_plan_indicator;
mod priority_flag;
pub mod tlv;
mod type_of_number;

pub use command_id::{CommandId, RESPONSE_BIT};
pub use command_status::CommandStatus;
pub use data_coding::{DataCoding, MessageClass};
pub use esm_class::{EsmClass, MessageMode};
pub use fixed_string::{
    Address, AddressRange, DistributionListName, FixedString, FixedStringError, LongAddress,
    MAX_SHORT_MESSAGE_LENGTH, MessageId, Password, ShortMessage, SmppTime, SystemId, SystemType,
    ServiceType,
};
pub use interface_version::InterfaceVersion;
pub use numeric_plan_indicator::NumericPlanIndicator;
pub use priority_flag::PriorityFlag;
pub use tlv::{Tlv, TlvTable, tags};
pub use type_of_number::TypeOfNumber;
