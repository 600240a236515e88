pub mod message;
pub mod news;
pub mod notification;
pub mod qa;
pub mod response;
pub mod user;
pub mod vote;
pub mod websocket;
