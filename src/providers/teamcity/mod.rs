mod server;
mod unmarshaller;

pub use server::TeamCityServer;
