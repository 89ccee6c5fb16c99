pub mod constraints;
pub mod drain_worker;
pub mod enqueue_helper;
pub mod processor_worker;
pub mod tags;
pub mod task_runner;
