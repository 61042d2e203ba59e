pub mod config;
pub mod domain;
pub mod errors;
pub mod pricing;
pub mod submission;

pub use config::{AppConfig, PricingConfig, SettingKey};
pub use domain::discount::{
    ComparisonOperator, ConditionField, Discount, DiscountCondition, DiscountKind, DiscountRule,
    DiscountRuleId, MalformedDiscountRule,
};
pub use domain::quote::{
    AppliedDiscount, ClientContact, Quote, QuoteId, QuoteLine, QuoteNumber, QuoteStatus,
};
pub use domain::room_type::{RoomEntry, RoomType, RoomTypeId};
pub use errors::{ApplicationError, DomainError, InterfaceError};
pub use pricing::catalog::RoomTypeRegistry;
pub use pricing::discount::{DiscountMode, QuoteAggregates};
pub use pricing::{format_amount, PricingResult, QuoteCalculator};
pub use submission::QuoteSubmission;
