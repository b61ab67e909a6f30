//! Local-domain resolution use case.
//!
//! Turns a set of candidate instance names into a full DNS response:
//! record lookup, health filtering, answer shuffling, and protocol-aware
//! truncation. Every answer is named by the original question so clients
//! accept it even when the candidates came from an alias expansion.

use std::net::Ipv4Addr;
use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use hickory_proto::op::{Message, MessageType, ResponseCode};
use hickory_proto::rr::rdata::A;
use hickory_proto::rr::{Name, RData, Record};
use hickory_proto::serialize::binary::{BinEncodable, BinEncoder};
use tracing::{debug, warn};

use fleet_dns_domain::Protocol;

use crate::ports::{DomainResolver, InstanceHealth, RecordSource};
use crate::services::AnswerShuffler;

/// Response size limit for clients that do not advertise EDNS.
const UDP_PAYLOAD_FLOOR: usize = 512;

pub struct LocalDomainResolver {
    record_source: Arc<dyn RecordSource>,
    instance_health: Arc<dyn InstanceHealth>,
    shuffler: Arc<dyn AnswerShuffler>,
}

impl LocalDomainResolver {
    pub fn new(
        record_source: Arc<dyn RecordSource>,
        instance_health: Arc<dyn InstanceHealth>,
        shuffler: Arc<dyn AnswerShuffler>,
    ) -> Self {
        Self {
            record_source,
            instance_health,
            shuffler,
        }
    }

    fn collect_answers(
        &self,
        record_set: &fleet_dns_domain::RecordSet,
        domains: &[String],
        answer_name: &Name,
    ) -> (Vec<Record>, ResponseCode) {
        let mut answers = Vec::new();
        let mut name_known = false;

        for domain in domains {
            if Name::from_str(domain).is_err() {
                warn!(domain = %domain, "Unresolvable name in candidate set");
                return (Vec::new(), ResponseCode::FormErr);
            }

            let ips = record_set.resolve(domain);
            if !ips.is_empty() {
                name_known = true;
            }

            for ip in ips {
                if !self.instance_health.state_of(&ip).is_answerable() {
                    debug!(domain = %domain, ip = %ip, "Filtered unhealthy instance");
                    continue;
                }
                match ip.parse::<Ipv4Addr>() {
                    Ok(addr) => answers.push(Record::from_rdata(
                        answer_name.clone(),
                        0,
                        RData::A(A(addr)),
                    )),
                    Err(_) => warn!(ip = %ip, "Skipping record with non-IPv4 value"),
                }
            }
        }

        let answers = self.shuffler.shuffle(answers);
        let rcode = if answers.is_empty() && !name_known {
            ResponseCode::NXDomain
        } else {
            ResponseCode::NoError
        };
        (answers, rcode)
    }
}

#[async_trait]
impl DomainResolver for LocalDomainResolver {
    async fn resolve(&self, domains: &[String], protocol: Protocol, request: &Message) -> Message {
        let answer_name = match request.queries().first() {
            Some(query) => query.name().clone(),
            None => return assemble(request, ResponseCode::NoError, &[], false),
        };

        let record_set = self.record_source.record_set().await;
        let (answers, rcode) = self.collect_answers(&record_set, domains, &answer_name);

        build_response(request, protocol, rcode, answers)
    }
}

fn build_response(
    request: &Message,
    protocol: Protocol,
    rcode: ResponseCode,
    mut answers: Vec<Record>,
) -> Message {
    let mut truncated = false;

    if protocol == Protocol::Udp {
        let limit = udp_size_limit(request);
        while !answers.is_empty() && wire_size(&assemble(request, rcode, &answers, truncated)) > limit
        {
            answers.pop();
            truncated = true;
        }
    }

    assemble(request, rcode, &answers, truncated)
}

fn assemble(request: &Message, rcode: ResponseCode, answers: &[Record], truncated: bool) -> Message {
    let mut response = Message::new(request.id(), MessageType::Response, request.op_code());
    response.set_authoritative(true);
    response.set_recursion_desired(request.recursion_desired());
    response.set_recursion_available(false);
    response.set_response_code(rcode);
    response.set_truncated(truncated);
    response.add_queries(request.queries().to_vec());
    for answer in answers {
        response.add_answer(answer.clone());
    }
    response
}

fn udp_size_limit(request: &Message) -> usize {
    let advertised = request
        .extensions()
        .as_ref()
        .map(|edns| edns.max_payload() as usize)
        .unwrap_or(0);
    advertised.max(UDP_PAYLOAD_FLOOR)
}

fn wire_size(message: &Message) -> usize {
    let mut buf = Vec::with_capacity(512);
    let mut encoder = BinEncoder::new(&mut buf);
    match message.emit(&mut encoder) {
        Ok(()) => buf.len(),
        // An unencodable message cannot be trimmed to fit either.
        Err(_) => 0,
    }
}
