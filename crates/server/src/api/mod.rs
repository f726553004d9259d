mod events;
mod handlers;
mod projects;
mod routes;
mod tasks;
mod translations;

pub use routes::create_router;
