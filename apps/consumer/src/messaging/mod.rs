pub mod consumer;
pub mod counter;
pub mod delivery;
pub mod factory;
pub mod handler;
pub mod memory;
pub mod message;
pub mod payload;
pub mod processor;
pub mod router;
pub mod transport;

pub use consumer::Consumer;
pub use counter::ConsumptionCounter;
pub use delivery::{Delivery, DeliveryGate};
pub use factory::ConsumerFactory;
pub use handler::{Dispatcher, FnHandler, Handler, HandlerError, Hook, TypedDispatcher};
pub use memory::{InMemoryPubSub, MemorySubscription};
pub use message::Message;
pub use payload::{EmptyPayload, ParseError, PayloadFormat, PayloadShape};
pub use processor::MessageProcessor;
pub use router::{FailureRouter, Route};
pub use transport::{PubSubClient, Publisher, Subscription, TransportError};
