pub mod billing_event;
pub mod subscriber;
pub mod subscription_status;
