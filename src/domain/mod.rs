mod client_info;
mod contact_message;
mod contact_name;
mod new_subscriber;
mod subscriber_email;

pub use client_info::ClientInfo;
pub use contact_message::{Interest, MessageBody, NewContactMessage, Organization};
pub use contact_name::ContactName;
pub use new_subscriber::NewSubscriber;
pub use subscriber_email::SubscriberEmail;
