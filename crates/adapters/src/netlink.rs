// SPDX-License-Identifier: MIT
// Copyright (c) 2026 The jack authors

//! rtnetlink-backed kernel monitor.
//!
//! Binds one netlink socket to the link, IPv4 address, and IPv4 route
//! multicast groups and translates raw messages into the typed updates the
//! observer consumes.

use futures_util::StreamExt;
use netlink_packet_core::NetlinkPayload;
use netlink_packet_route::address::{AddressAttribute, AddressMessage};
use netlink_packet_route::link::{LinkAttribute, LinkFlag, LinkMessage};
use netlink_packet_route::route::{RouteAddress, RouteAttribute, RouteMessage};
use netlink_packet_route::RouteNetlinkMessage;
use netlink_sys::{AsyncSocket, SocketAddr};
use rtnetlink::constants::{RTMGRP_IPV4_IFADDR, RTMGRP_IPV4_ROUTE, RTMGRP_LINK};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::error::SystemError;
use crate::system::{
    AddressUpdate, KernelEvents, KernelMonitor, LinkUpdate, RouteAction, RouteUpdate,
};

const CHANNEL_DEPTH: usize = 256;

/// Subscribes to rtnetlink multicast groups.
#[derive(Debug, Default, Clone)]
pub struct NetlinkMonitor;

impl NetlinkMonitor {
    pub fn new() -> Self {
        Self
    }
}

impl KernelMonitor for NetlinkMonitor {
    fn subscribe(&self) -> Result<KernelEvents, SystemError> {
        let (mut connection, handle, mut messages) = rtnetlink::new_connection()?;
        let groups = RTMGRP_LINK | RTMGRP_IPV4_IFADDR | RTMGRP_IPV4_ROUTE;
        connection
            .socket_mut()
            .socket_mut()
            .bind(&SocketAddr::new(0, groups))
            .map_err(|e| SystemError::Netlink(e.to_string()))?;
        tokio::spawn(connection);

        let (link_tx, links) = mpsc::channel(CHANNEL_DEPTH);
        let (addr_tx, addresses) = mpsc::channel(CHANNEL_DEPTH);
        let (route_tx, routes) = mpsc::channel(CHANNEL_DEPTH);

        tokio::spawn(async move {
            // The handle keeps the connection alive for the subscription's
            // lifetime even though no requests are issued through it.
            let _handle = handle;
            while let Some((message, _addr)) = messages.next().await {
                let NetlinkPayload::InnerMessage(inner) = message.payload else { continue };
                let delivered = match inner {
                    RouteNetlinkMessage::NewLink(msg) | RouteNetlinkMessage::DelLink(msg) => {
                        match link_update(&msg) {
                            Some(update) => link_tx.send(update).await.is_ok(),
                            None => true,
                        }
                    }
                    RouteNetlinkMessage::NewAddress(msg) => {
                        send_address(&addr_tx, &msg, true).await
                    }
                    RouteNetlinkMessage::DelAddress(msg) => {
                        send_address(&addr_tx, &msg, false).await
                    }
                    RouteNetlinkMessage::NewRoute(msg) => {
                        route_tx.send(route_update(&msg, RouteAction::Added)).await.is_ok()
                    }
                    RouteNetlinkMessage::DelRoute(msg) => {
                        route_tx.send(route_update(&msg, RouteAction::Deleted)).await.is_ok()
                    }
                    _ => true,
                };
                if !delivered {
                    debug!("kernel event receivers dropped; ending netlink pump");
                    break;
                }
            }
            warn!("netlink message stream ended");
        });

        Ok(KernelEvents { links, addresses, routes })
    }
}

fn link_update(msg: &LinkMessage) -> Option<LinkUpdate> {
    let mut name = None;
    let mut mtu = 0;
    for attribute in &msg.attributes {
        match attribute {
            LinkAttribute::IfName(value) => name = Some(value.clone()),
            LinkAttribute::Mtu(value) => mtu = *value,
            _ => {}
        }
    }
    Some(LinkUpdate { name: name?, up: msg.header.flags.contains(&LinkFlag::Up), mtu })
}

async fn send_address(
    tx: &mpsc::Sender<AddressUpdate>,
    msg: &AddressMessage,
    added: bool,
) -> bool {
    let mut address = None;
    let mut link = String::new();
    for attribute in &msg.attributes {
        match attribute {
            AddressAttribute::Address(value) => address = Some(value.to_string()),
            AddressAttribute::Label(value) => link = value.clone(),
            _ => {}
        }
    }
    let Some(address) = address else { return true };
    tx.send(AddressUpdate { link, link_index: msg.header.index, address, added })
        .await
        .is_ok()
}

fn route_update(msg: &RouteMessage, action: RouteAction) -> RouteUpdate {
    let mut destination = None;
    let mut gateway = None;
    let mut table = u32::from(msg.header.table);
    for attribute in &msg.attributes {
        match attribute {
            RouteAttribute::Destination(value) => {
                destination =
                    route_address(value).map(|ip| {
                        format!("{ip}/{}", msg.header.destination_prefix_length)
                    });
            }
            RouteAttribute::Gateway(value) => gateway = route_address(value),
            RouteAttribute::Table(value) => table = *value,
            _ => {}
        }
    }
    RouteUpdate { destination, gateway, table, action }
}

fn route_address(address: &RouteAddress) -> Option<String> {
    match address {
        RouteAddress::Inet(ip) => Some(ip.to_string()),
        RouteAddress::Inet6(ip) => Some(ip.to_string()),
        _ => None,
    }
}
