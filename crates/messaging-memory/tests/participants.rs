//! Participants talking through the memory bus.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use parking_lot::Mutex;
use scopebus_converter::{ConverterMap, ConverterRegistry, ProtocolBufferConverter, StringConverter};
use scopebus_messaging::{
    Error, Event, Factory, Informer, MethodFilter, ParticipantConfig, Port, Scope, ScopeFilter,
};
use scopebus_messaging_memory::{MemoryBus, MemoryPort};
use serial_test::serial;
use tokio::sync::mpsc;
use tokio::time::timeout;

fn factory(bus: &MemoryBus) -> Factory<Bytes> {
    Factory::new(Arc::new(bus.clone()))
        .with_converters(ConverterRegistry::with_builtin_converters().converter_map::<Bytes>())
}

fn scope(scope: &str) -> Scope {
    Scope::new(scope).unwrap()
}

async fn next(receiver: &mut mpsc::UnboundedReceiver<Event>) -> Event {
    timeout(Duration::from_secs(1), receiver.recv())
        .await
        .unwrap()
        .unwrap()
}

#[tokio::test]
async fn test_listener_receives_in_order() {
    let _ = tracing_subscriber::fmt::try_init();

    let bus = MemoryBus::new();
    let factory = factory(&bus);
    let listener = factory.create_listener(scope("/example/informer")).await.unwrap();
    let informer = factory.create_informer(scope("/example/informer")).await.unwrap();

    let (sender, mut receiver) = mpsc::unbounded_channel();
    listener.add_handler(Arc::new(move |event: Event| {
        let sender = sender.clone();
        async move {
            let _ = sender.send(event);
        }
    }));

    for i in 0..100_i64 {
        informer.publish(i).await.unwrap();
    }

    for i in 0..100_i64 {
        let event = next(&mut receiver).await;
        assert_eq!(event.data.cloned::<i64>(), Some(i));
        assert_eq!(event.id.unwrap().participant_id(), informer.id());
        assert_eq!(event.id.unwrap().sequence_number(), u64::try_from(i).unwrap());
        assert!(event.meta_data.send_time.is_some());
        assert!(event.meta_data.receive_time.is_some());
        assert!(event.meta_data.deliver_time.is_some());
    }
}

#[tokio::test]
async fn test_scope_routing() {
    let bus = MemoryBus::new();
    let factory = factory(&bus);
    let mut parent = factory.create_reader(scope("/a")).await.unwrap();
    let mut child = factory.create_reader(scope("/a/b")).await.unwrap();
    let mut sibling = factory.create_reader(scope("/c")).await.unwrap();
    let informer = factory.create_informer(scope("/a")).await.unwrap();

    informer
        .publish_event(Event::with_data(scope("/a/b/c"), String::from("deep")))
        .await
        .unwrap();
    informer
        .publish_event(Event::with_data(scope("/a"), String::from("top")))
        .await
        .unwrap();

    let first = parent.read_timeout(Duration::from_secs(1)).await.unwrap();
    let second = parent.read_timeout(Duration::from_secs(1)).await.unwrap();
    assert_eq!(first.data.cloned::<String>().unwrap(), "deep");
    assert_eq!(second.data.cloned::<String>().unwrap(), "top");

    let only = child.read_timeout(Duration::from_secs(1)).await.unwrap();
    assert_eq!(only.scope, scope("/a/b/c"));
    assert!(matches!(
        child.read_timeout(Duration::from_millis(50)).await,
        Err(Error::Timeout(_))
    ));
    assert!(sibling.try_read().is_none());
}

#[tokio::test]
async fn test_informer_rejects_foreign_scope() {
    let bus = MemoryBus::new();
    let informer = factory(&bus).create_informer(scope("/a/b")).await.unwrap();

    let result = informer
        .publish_event(Event::with_data(scope("/a"), ()))
        .await;

    assert!(matches!(result, Err(Error::ScopeMismatch { .. })));
}

#[tokio::test]
async fn test_method_filter() {
    let bus = MemoryBus::new();
    let factory = factory(&bus);
    let listener = factory.create_listener(scope("/rpc")).await.unwrap();
    listener
        .add_filter(Arc::new(MethodFilter::new("REPLY")))
        .await
        .unwrap();
    let informer = factory.create_informer(scope("/rpc")).await.unwrap();

    let (sender, mut receiver) = mpsc::unbounded_channel();
    listener.add_handler(Arc::new(move |event: Event| {
        let sender = sender.clone();
        async move {
            let _ = sender.send(event);
        }
    }));

    informer
        .publish_event(Event::with_data(scope("/rpc"), 1_u32).with_method("REQUEST"))
        .await
        .unwrap();
    informer
        .publish_event(Event::with_data(scope("/rpc"), 2_u32).with_method("REPLY"))
        .await
        .unwrap();

    let event = next(&mut receiver).await;
    assert_eq!(event.data.cloned::<u32>(), Some(2));
    assert!(receiver.try_recv().is_err());
}

#[tokio::test]
async fn test_deactivated_reader_stops_receiving() {
    let bus = MemoryBus::new();
    let factory = factory(&bus);
    let mut reader = factory.create_reader(scope("/a")).await.unwrap();
    let informer = factory.create_informer(scope("/a")).await.unwrap();

    informer.publish(String::from("before")).await.unwrap();
    let event = reader.read_timeout(Duration::from_secs(1)).await.unwrap();
    assert_eq!(event.data.cloned::<String>().unwrap(), "before");

    reader.deactivate().await.unwrap();
    informer.publish(String::from("after")).await.unwrap();

    assert!(matches!(reader.read().await, Err(Error::ChannelClosed)));
}

#[tokio::test]
async fn test_deactivated_informer_rejects_publish() {
    let bus = MemoryBus::new();
    let informer = factory(&bus).create_informer(scope("/a")).await.unwrap();

    informer.deactivate().await.unwrap();

    assert!(matches!(informer.publish(()).await, Err(Error::Inactive)));
}

#[tokio::test]
async fn test_undecodable_notification_reaches_error_action() {
    let bus = MemoryBus::new();

    let mut converters = ConverterMap::<Bytes>::new();
    converters.add_converter(StringConverter::ascii(), false).unwrap();
    let sender_port = MemoryPort::new(bus.clone(), Arc::new(converters));
    let informer = Informer::new(scope("/a"), Box::new(sender_port), &ParticipantConfig::default())
        .await
        .unwrap();

    let receiver_port = MemoryPort::new(
        bus.clone(),
        ConverterRegistry::with_builtin_converters().converter_map::<Bytes>(),
    );
    let errors = Arc::new(Mutex::new(Vec::new()));
    let delivered = Arc::new(Mutex::new(0_usize));
    receiver_port.set_error_action(Some(Arc::new({
        let errors = Arc::clone(&errors);
        move |error: &Error| errors.lock().push(error.to_string())
    })));
    receiver_port.set_observer_action(Some(Arc::new({
        let delivered = Arc::clone(&delivered);
        move |_: Event| *delivered.lock() += 1
    })));
    receiver_port
        .filter_notify(Arc::new(ScopeFilter::new(scope("/a"))), scopebus_messaging::FilterAction::Add)
        .await
        .unwrap();
    receiver_port.activate().await.unwrap();

    informer.publish(String::from("plain")).await.unwrap();

    timeout(Duration::from_secs(1), async {
        while errors.lock().is_empty() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .unwrap();

    assert!(errors.lock()[0].contains("ascii-string"));
    assert_eq!(*delivered.lock(), 0);
}

#[derive(Clone, PartialEq, prost::Message)]
struct Reading {
    #[prost(string, tag = "1")]
    sensor: String,
    #[prost(double, tag = "2")]
    value: f64,
}

impl prost::Name for Reading {
    const NAME: &'static str = "Reading";
    const PACKAGE: &'static str = "scopebus.example";
}

#[tokio::test]
#[serial]
async fn test_globally_registered_converter() {
    ConverterRegistry::global()
        .register_converter(ProtocolBufferConverter::<Reading>::new(), true)
        .unwrap();

    let bus = MemoryBus::new();
    let factory = Factory::new(Arc::new(bus.clone()));
    let mut reader = factory.create_reader(scope("/sensors")).await.unwrap();
    let informer = factory.create_informer(scope("/sensors")).await.unwrap();

    let reading = Reading {
        sensor: "temperature".to_string(),
        value: 21.5,
    };
    informer.publish(reading.clone()).await.unwrap();

    let event = reader.read_timeout(Duration::from_secs(1)).await.unwrap();
    assert_eq!(event.data.cloned::<Reading>(), Some(reading));
}
