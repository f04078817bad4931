mod common;
mod default_instance;
mod failure_and_clear;
