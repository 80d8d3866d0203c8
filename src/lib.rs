pub mod async_task;
pub mod cli;
pub mod collapse;
pub mod command;
pub mod compare;
pub mod config;
pub mod dialogs;
pub mod diff_ranges;
pub mod dispatcher;
pub mod error;
pub mod executor;
pub mod guard;
pub mod local_engine;
pub mod main_lib;
pub mod navigator;
pub mod path_set;
pub mod remote;
pub mod search;
pub mod selection;
pub mod session;
pub mod tree;
