//! Wire structures exchanged with producer clients over the local
//! datagram socket.

mod submission;

pub use submission::{
    predict_size, predict_size_partition_key, DecodeError, Submission, API_KEY_ANY_PARTITION,
    API_KEY_PARTITION_KEY, API_VERSION, MAX_KEY_SIZE, MAX_TOPIC_SIZE, MAX_VALUE_SIZE,
};
