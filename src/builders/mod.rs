pub mod network;
pub mod replay_buffer;

pub use network::NetworkBuilder;
pub use replay_buffer::ReplayBufferBuilder;
