#![allow(dead_code)]

pub mod content_server;
