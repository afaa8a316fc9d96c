//! One-shot client

use anyhow::{Context, Result};
use colored::Colorize;
use fastosc_core::{decode, encode_message, ArgValue, Packet};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::UdpSocket;
use tokio::time::Instant;

use crate::values::format_args;

/// Send a message and print every reply that arrives within `wait`
pub async fn send_message(target: &str, address: &str, args: Vec<ArgValue>, wait: Duration) -> Result<()> {
    let target: SocketAddr = tokio::net::lookup_host(target)
        .await
        .with_context(|| format!("Failed to resolve {}", target))?
        .next()
        .with_context(|| format!("No address for {}", target))?;

    let frame = encode_message(address, &args)?;
    let bind = if target.is_ipv4() { "0.0.0.0:0" } else { "[::]:0" };
    let socket = UdpSocket::bind(bind).await.context("Failed to bind client socket")?;
    socket.send_to(frame.as_bytes(), target).await?;

    println!(
        "{} {} {} {}",
        "->".cyan().bold(),
        frame.address().yellow(),
        frame.type_tags().dimmed(),
        format_args(&args)
    );

    let deadline = Instant::now() + wait;
    let mut buf = vec![0u8; fastosc_core::MAX_DATAGRAM_SIZE];
    let mut replies = 0;

    while let Ok(received) = tokio::time::timeout_at(deadline, socket.recv_from(&mut buf)).await {
        let (len, from) = received?;
        match decode(&buf[..len]) {
            Ok(packet) => replies += print_packet(&packet, from),
            Err(e) => println!("{} {} from {}", "!!".red().bold(), e, from),
        }
    }

    if replies == 0 {
        println!("{}", "No reply".yellow());
    }
    Ok(())
}

fn print_packet(packet: &Packet, from: SocketAddr) -> usize {
    match packet {
        Packet::Message(message) => {
            println!(
                "{} {} {} ({})",
                "<-".green().bold(),
                message.address.yellow(),
                format_args(&message.args),
                from
            );
            1
        }
        Packet::Bundle(bundle) => bundle.content.iter().map(|p| print_packet(p, from)).sum(),
    }
}
