pub mod clash_service;
pub mod converter;
pub mod fallback;
pub mod subscription_service;

#[cfg(test)]
pub(crate) mod fakes;

pub use clash_service::ClashService;
pub use converter::SubscriptionConverter;
pub use subscription_service::SubscriptionService;
