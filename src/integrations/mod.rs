pub mod nodit;
pub mod twilio;

pub use nodit::NoditClient;
pub use twilio::TwilioClient;
