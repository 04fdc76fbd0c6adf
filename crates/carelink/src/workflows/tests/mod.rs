mod common;
mod providers;
mod requests;
