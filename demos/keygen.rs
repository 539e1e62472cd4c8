use anyhow::{anyhow, bail};
use cmp_ecdsa::algorithms::to_scalar;
use cmp_ecdsa::ecdsa::keygen::Keygen;
use cmp_ecdsa::ecdsa::signature::Sign;
use cmp_ecdsa::ecdsa::{start_keygen, start_sign, KeygenOutput};
use cmp_ecdsa::protocol::{Address, InputMessage, Instruction, PartyIndex};
use cmp_ecdsa::round::{start, InMsg, OutMsg, ProtocolTraits};
use cmp_ecdsa::state_machine::{async_channels, sync_channels};
use cmp_ecdsa::{Parameters, RoundConfig};
use crossbeam_channel::{Receiver, Sender};
use curv::BigInt;
use futures::channel::mpsc::{self, UnboundedSender};
use futures::StreamExt;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::prelude::*;
use std::thread::JoinHandle;
use std::{env, thread};

type KeygenMsg = cmp_ecdsa::ecdsa::messages::keygen::Message;
type SignMsg = cmp_ecdsa::ecdsa::messages::sign::Message;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args: Vec<String> = env::args().collect();
    let _ = env_logger::builder().try_init();

    if args.len() < 4 {
        println!(
            "usage: {} min_number_of_signers share_count output_file_name_prefix [message]",
            args[0]
        );
        bail!("too few arguments")
    }

    let params = Parameters::new(args[1].parse()?, args[2].parse()?)?;
    let outputs = keygen_helper(params, &args[3])?;

    if let Some(message) = args.get(4) {
        signing_helper(params, outputs, message).await?;
    }
    Ok(())
}

/// Runs key generation with a thread per party and writes the output of each party to `<prefix>.<index>.json`
fn keygen_helper(
    params: Parameters,
    filename_prefix: &str,
) -> anyhow::Result<BTreeMap<PartyIndex, KeygenOutput>> {
    let parties = (0..params.share_count())
        .map(PartyIndex::from)
        .collect::<Vec<_>>();

    let mut nodes = Vec::new();
    let mut node_results = Vec::new();

    for party in parties.iter().cloned() {
        let (ingress, rx) = crossbeam_channel::unbounded();
        let (tx, egress) = crossbeam_channel::unbounded();

        log::info!("starting party {}", party);
        let start_func = start_keygen(
            parties.clone(),
            params.threshold(),
            party,
            RoundConfig::default(),
        );
        let join_handle = thread::spawn(move || {
            let (driver, _) = start(start_func).map_err(|e| anyhow!("{:?}", e))?;
            let mut machine =
                sync_channels::StateMachine::<ProtocolTraits<Keygen>>::new(Box::new(driver), &rx, &tx);
            match machine.execute() {
                Some(Ok(output)) => Ok(output),
                Some(Err(e)) => bail!("error {:?}", e),
                None => bail!("error in the machine"),
            }
        });
        nodes.push(Node {
            party,
            egress,
            ingress,
        });
        node_results.push(NodeResult { party, join_handle })
    }

    let _mx_thread = thread::spawn(move || loop {
        let mut output_messages = Vec::new();
        // collect output from nodes
        for node in nodes.iter() {
            if let Ok(out_msg) = node.egress.try_recv() {
                output_messages.push((node.party, out_msg));
            }
        }
        if output_messages.is_empty() {
            thread::yield_now();
        }
        // forward collected messages
        for (source, msg) in output_messages {
            nodes
                .iter()
                .filter(|node| match &msg.recipient {
                    Address::Broadcast => node.party != source,
                    Address::Peer(peer) => node.party == *peer,
                })
                .for_each(|node| {
                    // the recipient may have terminated already
                    let _ = node.ingress.send(InputMessage {
                        sender: source,
                        body: msg.body.clone(),
                    });
                });
        }
    });

    let mut outputs = BTreeMap::new();
    for node in node_results {
        let output = node
            .join_handle
            .join()
            .map_err(|_| anyhow!("party {} panicked", node.party))??;
        outputs.insert(node.party, output);
    }

    for (index, (party, output)) in outputs.iter().enumerate() {
        let path = format!("{}.{}.json", filename_prefix, index);
        let mut file = File::create(&path)?;
        file.write_all(serde_json::to_string_pretty(output)?.as_bytes())?;
        log::info!("party {} saved its key share to {}", party, path);
    }
    Ok(outputs)
}

/// Signs the message by the first `threshold + 1` parties, each of them running in a task of the async runtime
async fn signing_helper(
    params: Parameters,
    mut outputs: BTreeMap<PartyIndex, KeygenOutput>,
    message: &str,
) -> anyhow::Result<()> {
    let mut hasher = Sha256::new();
    hasher.input(message.as_bytes());
    let message_hash = to_scalar(&BigInt::from(hasher.result().as_slice()))
        .ok_or_else(|| anyhow!("message hash is zero"))?;

    let signers = outputs
        .keys()
        .take(params.threshold() + 1)
        .cloned()
        .collect::<Vec<_>>();

    let mut ingress: BTreeMap<PartyIndex, UnboundedSender<Instruction<InMsg<SignMsg>>>> =
        BTreeMap::new();
    let mut egresses = Vec::new();
    let mut handles = Vec::new();

    for party in signers.iter().cloned() {
        let output = outputs
            .remove(&party)
            .ok_or_else(|| anyhow!("no key share of party {}", party))?;
        let (in_tx, in_rx) = mpsc::unbounded();
        let (out_tx, out_rx) = mpsc::unbounded::<OutMsg<SignMsg>>();
        ingress.insert(party, in_tx);
        egresses.push((party, out_rx));

        let start_func = start_sign(
            output.session,
            output.secret,
            signers.clone(),
            message_hash,
            RoundConfig::default(),
        );
        handles.push((
            party,
            tokio::spawn(async move {
                let (driver, _) = start(start_func).map_err(|e| anyhow!("{:?}", e))?;
                let mut machine = async_channels::StateMachine::<ProtocolTraits<Sign>>::new(
                    Box::new(driver),
                    in_rx,
                    out_tx,
                );
                match machine.execute().await {
                    Some(Ok(signature)) => Ok(signature),
                    Some(Err(e)) => bail!("error {:?}", e),
                    None => bail!("error in the machine"),
                }
            }),
        ));
    }

    for (source, mut egress) in egresses {
        let ingress = ingress.clone();
        tokio::spawn(async move {
            while let Some(msg) = egress.next().await {
                ingress
                    .iter()
                    .filter(|(party, _)| match &msg.recipient {
                        Address::Broadcast => **party != source,
                        Address::Peer(peer) => *party == peer,
                    })
                    .for_each(|(_, tx)| {
                        let _ = tx.unbounded_send(Instruction::Data(InputMessage {
                            sender: source,
                            body: msg.body.clone(),
                        }));
                    });
            }
        });
    }

    for (party, handle) in handles {
        let signature = handle.await??;
        log::info!("party {} computed signature {:?}", party, signature);
    }
    for tx in ingress.values() {
        let _ = tx.unbounded_send(Instruction::Terminate);
    }
    Ok(())
}

struct Node {
    party: PartyIndex,
    egress: Receiver<OutMsg<KeygenMsg>>,
    ingress: Sender<InMsg<KeygenMsg>>,
}

struct NodeResult {
    party: PartyIndex,
    join_handle: JoinHandle<anyhow::Result<KeygenOutput>>,
}
