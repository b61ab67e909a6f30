use std::net::{Ipv4Addr, SocketAddr};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use hickory_proto::op::{Message, MessageType, OpCode, Query, ResponseCode};
use hickory_proto::rr::rdata::A;
use hickory_proto::rr::{Name, RData, RecordType};
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;

use fleet_dns_application::ports::{Clock, Dialer, DomainResolver, HealthCheck};
use fleet_dns_application::{LocalDomainResolver, RandomAnswerShuffler};
use fleet_dns_domain::{AliasConfig, HealthState, Protocol, RecordSet};
use fleet_dns_infrastructure::dns::handlers::{
    AliasResolvingHandler, DiscoveryHandler, ForwardHandler, RequestLoggerHandler, UpcheckHandler,
};
use fleet_dns_infrastructure::dns::{
    DnsHandler, DnsListener, DnsServer, Exchanger, HandlerMux, ListenerHealthCheck, NetExchanger,
    ServerError, TcpServerListener, UdpServerListener,
};
use fleet_dns_infrastructure::{InstanceHealthTable, NetDialer, StaticRecordSource, SystemClock};

const LOCAL_DOMAIN: &str = "fleet.";
const UPCHECK_DOMAIN: &str = "healthcheck.fleet-dns.";

const RECORDS_JSON: &str = r#"{
    "record_keys": ["id", "instance_group", "network", "deployment", "ip"],
    "record_infos": [
        ["web-0", "web", "default", "shop", "10.0.16.5"],
        ["web-1", "web", "default", "shop", "10.0.16.9"],
        ["db-0", "db", "default", "shop", "10.0.16.21"]
    ]
}"#;

/// Finds a port that is currently free for both transports.
fn free_dual_port() -> u16 {
    for _ in 0..32 {
        let tcp = std::net::TcpListener::bind("127.0.0.1:0").expect("probe tcp port");
        let port = tcp.local_addr().expect("probe local addr").port();
        if std::net::UdpSocket::bind(("127.0.0.1", port)).is_ok() {
            return port;
        }
    }
    panic!("no port free on both transports");
}

fn question(name: &str, record_type: RecordType) -> Message {
    let mut message = Message::new(fastrand::u16(..), MessageType::Query, OpCode::Query);
    message.set_recursion_desired(true);
    message.add_query(Query::query(Name::from_str(name).expect("query name"), record_type));
    message
}

fn single_a_answer(response: &Message) -> (String, Ipv4Addr, u32) {
    assert_eq!(response.answers().len(), 1, "expected one answer: {response:?}");
    let record = &response.answers()[0];
    let RData::A(A(addr)) = record.data() else {
        panic!("expected an A record: {record:?}");
    };
    (record.name().to_string(), *addr, record.ttl())
}

struct TestServer {
    address: SocketAddr,
    client: NetExchanger,
    shutdown: CancellationToken,
    run: JoinHandle<Result<(), ServerError>>,
}

impl TestServer {
    /// Spins up the full stack on a free localhost port: record source,
    /// health table, resolver, the alias/discovery/forward handler chain,
    /// both listeners, and self-dial health checks.
    async fn start() -> Self {
        let port = free_dual_port();
        let bind = format!("127.0.0.1:{port}");
        let address: SocketAddr = bind.parse().expect("bind address");

        let record_set = RecordSet::from_json(RECORDS_JSON, LOCAL_DOMAIN).expect("records fixture");
        let records = Arc::new(StaticRecordSource::new(record_set));
        let health = Arc::new(InstanceHealthTable::new());
        health.mark("10.0.16.9", HealthState::Unhealthy);
        let resolver: Arc<dyn DomainResolver> = Arc::new(LocalDomainResolver::new(
            records,
            health,
            Arc::new(RandomAnswerShuffler::new()),
        ));
        let clock: Arc<dyn Clock> = Arc::new(SystemClock::new());

        let mut mux = HandlerMux::new();
        mux.handle(UPCHECK_DOMAIN, Arc::new(UpcheckHandler::new()));
        mux.handle(LOCAL_DOMAIN, Arc::new(DiscoveryHandler::new(resolver.clone())));
        mux.handle(
            ".",
            Arc::new(ForwardHandler::new(
                Vec::new(),
                Arc::new(NetExchanger::new(Duration::from_secs(1))),
            )),
        );

        let mut aliases = AliasConfig::new();
        aliases
            .insert("shop.fleet.", &["web-0.web.default.shop.fleet.".to_string()])
            .expect("alias fixture");
        aliases
            .insert("db.internal.", &["db-0.db.default.shop.fleet.".to_string()])
            .expect("alias fixture");
        let aliased = AliasResolvingHandler::new(Arc::new(mux), aliases, resolver, clock.clone())
            .expect("aliases are reduced");
        let root: Arc<dyn DnsHandler> = Arc::new(RequestLoggerHandler::new(Arc::new(aliased), clock));

        let dialer: Arc<dyn Dialer> = Arc::new(NetDialer::new());
        let shutdown = CancellationToken::new();
        let server = DnsServer::new(
            vec![
                Arc::new(UdpServerListener::new(bind.clone(), root.clone())) as Arc<dyn DnsListener>,
                Arc::new(TcpServerListener::new(bind, root)) as Arc<dyn DnsListener>,
            ],
            vec![
                (
                    Protocol::Udp,
                    Arc::new(ListenerHealthCheck::new(Protocol::Udp, address, dialer.clone()))
                        as Arc<dyn HealthCheck>,
                ),
                (
                    Protocol::Tcp,
                    Arc::new(ListenerHealthCheck::new(Protocol::Tcp, address, dialer))
                        as Arc<dyn HealthCheck>,
                ),
            ],
            Duration::from_secs(5),
            shutdown.clone(),
        );
        let run = tokio::spawn(async move { server.run().await });

        wait_until_accepting(address).await;

        Self {
            address,
            client: NetExchanger::new(Duration::from_secs(2)),
            shutdown,
            run,
        }
    }

    async fn query(&self, protocol: Protocol, name: &str, record_type: RecordType) -> Message {
        let request = question(name, record_type);
        self.client
            .exchange(&request, protocol, self.address)
            .await
            .expect("exchange with server")
    }

    async fn stop(self) {
        self.shutdown.cancel();
        let result = timeout(Duration::from_secs(5), self.run)
            .await
            .expect("run should return after cancellation")
            .expect("run task should not panic");
        assert!(result.is_ok(), "server run failed: {result:?}");
    }
}

async fn wait_until_accepting(address: SocketAddr) {
    timeout(Duration::from_secs(5), async {
        while tokio::net::TcpStream::connect(address).await.is_err() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("server should start accepting connections");
}

#[tokio::test]
async fn test_upcheck_roundtrip_over_udp() {
    let server = TestServer::start().await;

    let response = server.query(Protocol::Udp, UPCHECK_DOMAIN, RecordType::A).await;

    assert_eq!(response.response_code(), ResponseCode::NoError);
    assert!(response.authoritative());
    assert!(!response.recursion_available());
    let (name, addr, ttl) = single_a_answer(&response);
    assert_eq!(name, UPCHECK_DOMAIN);
    assert_eq!(addr, Ipv4Addr::LOCALHOST);
    assert_eq!(ttl, 0);

    server.stop().await;
}

#[tokio::test]
async fn test_discovery_resolves_instance_over_udp() {
    let server = TestServer::start().await;

    let response = server
        .query(Protocol::Udp, "web-0.web.default.shop.fleet.", RecordType::A)
        .await;

    assert_eq!(response.response_code(), ResponseCode::NoError);
    assert!(response.authoritative());
    let (name, addr, ttl) = single_a_answer(&response);
    assert_eq!(name, "web-0.web.default.shop.fleet.");
    assert_eq!(addr, Ipv4Addr::new(10, 0, 16, 5));
    assert_eq!(ttl, 0);

    server.stop().await;
}

#[tokio::test]
async fn test_discovery_resolves_instance_over_tcp() {
    let server = TestServer::start().await;

    let response = server
        .query(Protocol::Tcp, "db-0.db.default.shop.fleet.", RecordType::A)
        .await;

    assert_eq!(response.response_code(), ResponseCode::NoError);
    let (name, addr, _) = single_a_answer(&response);
    assert_eq!(name, "db-0.db.default.shop.fleet.");
    assert_eq!(addr, Ipv4Addr::new(10, 0, 16, 21));

    server.stop().await;
}

#[tokio::test]
async fn test_unknown_instance_gets_nxdomain() {
    let server = TestServer::start().await;

    let response = server
        .query(Protocol::Udp, "missing.web.default.shop.fleet.", RecordType::A)
        .await;

    assert_eq!(response.response_code(), ResponseCode::NXDomain);
    assert!(response.authoritative());
    assert!(response.answers().is_empty());

    server.stop().await;
}

#[tokio::test]
async fn test_unhealthy_instance_answers_empty_success() {
    let server = TestServer::start().await;

    let response = server
        .query(Protocol::Udp, "web-1.web.default.shop.fleet.", RecordType::A)
        .await;

    // The name is known, so this is an empty success rather than NXDOMAIN.
    assert_eq!(response.response_code(), ResponseCode::NoError);
    assert!(response.authoritative());
    assert!(response.answers().is_empty());

    server.stop().await;
}

#[tokio::test]
async fn test_alias_answers_with_question_name() {
    let server = TestServer::start().await;

    let response = server.query(Protocol::Udp, "shop.fleet.", RecordType::A).await;

    assert_eq!(response.response_code(), ResponseCode::NoError);
    let (name, addr, ttl) = single_a_answer(&response);
    assert_eq!(name, "shop.fleet.");
    assert_eq!(addr, Ipv4Addr::new(10, 0, 16, 5));
    assert_eq!(ttl, 0);

    server.stop().await;
}

#[tokio::test]
async fn test_alias_outside_local_domain_resolves() {
    let server = TestServer::start().await;

    let response = server.query(Protocol::Udp, "db.internal.", RecordType::A).await;

    assert_eq!(response.response_code(), ResponseCode::NoError);
    let (name, addr, _) = single_a_answer(&response);
    assert_eq!(name, "db.internal.");
    assert_eq!(addr, Ipv4Addr::new(10, 0, 16, 21));

    server.stop().await;
}

#[tokio::test]
async fn test_out_of_zone_query_without_recursors_gets_servfail() {
    let server = TestServer::start().await;

    let response = server.query(Protocol::Udp, "example.com.", RecordType::A).await;

    assert_eq!(response.response_code(), ResponseCode::ServFail);
    assert!(response.answers().is_empty());

    server.stop().await;
}

#[tokio::test]
async fn test_aaaa_query_answers_empty_success() {
    let server = TestServer::start().await;

    let response = server
        .query(Protocol::Udp, "web-0.web.default.shop.fleet.", RecordType::AAAA)
        .await;

    assert_eq!(response.response_code(), ResponseCode::NoError);
    assert!(response.authoritative());
    assert!(response.answers().is_empty());

    server.stop().await;
}
