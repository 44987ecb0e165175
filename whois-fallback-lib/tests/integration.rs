//! Integration tests for whois-fallback-lib exports and core functionality

use std::sync::Arc;
use std::time::Duration;

use chrono::{TimeZone, Utc};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use whois_fallback_lib::{
    extract, extract_record, is_fully_qualified_domain_name, parse, sanitize, AuthorityRecord,
    ConnectionOptions, LookupError, ParsedRecord, ProxyList, Resolver, ResolverConfig, ServerDescriptor,
    ServerDirectory, Strategy,
};

const MARKMONITOR_REPLY: &str = "\
Domain Name: google.com
Registry Domain ID: 2138514_DOMAIN_COM-VRSN
Registrar WHOIS Server: whois.markmonitor.com
Registrar URL: http://www.markmonitor.com
Updated Date: 2015-06-12T10:38:52-0700
Creation Date: 1997-09-15T00:00:00-0700
Registrar Registration Expiration Date: 2020-09-13T21:00:00-0700
Registrar: MarkMonitor, Inc.
Registrar IANA ID: 292
Registrar Abuse Contact Email: abusecomplaints@markmonitor.com
Registrar Abuse Contact Phone: +1.2083895740
Domain Status: clientUpdateProhibited (https://www.icann.org/epp#clientUpdateProhibited)
Domain Status: clientTransferProhibited (https://www.icann.org/epp#clientTransferProhibited)
Domain Status: clientDeleteProhibited (https://www.icann.org/epp#clientDeleteProhibited)
Domain Status: serverUpdateProhibited (https://www.icann.org/epp#serverUpdateProhibited)
Domain Status: serverTransferProhibited (https://www.icann.org/epp#serverTransferProhibited)
Domain Status: serverDeleteProhibited (https://www.icann.org/epp#serverDeleteProhibited)
Registry Registrant ID:
Registrant Name: Dns Admin
Registrant Organization: Google Inc.
Registrant Street: Please contact contact-admin@google.com, 1600 Amphitheatre Parkway
Registrant City: Mountain View
Registrant State/Province: CA
Registrant Postal Code: 94043
Registrant Country: US
Registrant Phone: +1.6502530000
Registrant Phone Ext:
Registrant Fax: +1.6506188571
Registrant Fax Ext:
Registrant Email: dns-admin@google.com
Registry Admin ID:
Admin Name: DNS Admin
Admin Organization: Google Inc.
Admin Street: 1600 Amphitheatre Parkway
Admin City: Mountain View
Admin State/Province: CA
Admin Postal Code: 94043
Admin Country: US
Admin Phone: +1.6506234000
Admin Phone Ext:
Admin Fax: +1.6506188571
Admin Fax Ext:
Admin Email: dns-admin@google.com
Registry Tech ID:
Tech Name: DNS Admin
Tech Organization: Google Inc.
Tech Street: 2400 E. Bayshore Pkwy
Tech City: Mountain View
Tech State/Province: CA
Tech Postal Code: 94043
Tech Country: US
Tech Phone: +1.6503300100
Tech Phone Ext:
Tech Fax: +1.6506181499
Tech Fax Ext:
Tech Email: dns-admin@google.com
Name Server: ns4.google.com
Name Server: ns2.google.com
Name Server: ns1.google.com
Name Server: ns3.google.com
DNSSEC: unsigned
URL of the ICANN WHOIS Data Problem Reporting System: http://wdprs.internic.net/
>>> Last update of WHOIS database: 2017-02-22T03:53:14-0800 <<<

The Data in MarkMonitor.com's WHOIS database is provided by MarkMonitor.com for
information purposes, and to assist persons in obtaining information about or
related to a domain name registration record.  MarkMonitor.com does not guarantee
its accuracy.  By submitting a WHOIS query, you agree that you will use this Data
only for lawful purposes and that, under no circumstances will you use this Data to:
(1) allow, enable, or otherwise support the transmission of mass unsolicited,
    commercial advertising or solicitations via e-mail (spam); or
(2) enable high volume, automated, electronic processes that apply to
    MarkMonitor.com (or its systems).
MarkMonitor.com reserves the right to modify these terms at any time.
By submitting this query, you agree to abide by this policy.

Visit MarkMonitor at http://www.markmonitor.com
Contact us at +1.8007459229
In Europe, at +44.02032062220

For more information on Whois status codes, please visit
https://www.icann.org/resources/pages/epp-status-codes-2014-06-16-en
--
";

const XINNET_REPLY: &str = "\
Domain Name:addlvr.com
Registry Domain ID:2323887016_DOMAIN_COM-VRSN
Registrar WHOIS Server:whois.paycenter.com.cn
Registrar URL:http://www.xinnet.com
Updated Date:2018-10-22T04:51:08.00Z
Creation Date:2018-10-21T02:11:14.00Z
Registrar Registration Expiration Date:2019-10-21T02:11:14.00Z
Registrar:XINNET TECHNOLOGY CORPORATION
Registrar IANA ID:120
Registrar Abuse Contact Email:supervision@xinnet.com
Registrar Abuse Contact Phone:+86.1087128064
Reseller:hefeixunyunwangluokejiyouxiangongsi
Domain Status:ok https://www.icann.org/epp#ok
Registry Registrant ID:
Registrant Name:
Registrant Organization:
Registrant Street:
Registrant City:
Registrant State/Province:
Registrant Postal Code:
Registrant Country:
Registrant Phone:
Registrant Phone Ext:
Registrant Fax:
Registrant Fax Ext:
Registrant Email:
Registry Admin ID:
Admin Name:
Admin Organization:
Admin Street:
Admin City:
Admin State/Province:
Admin PostalCode:
Admin Country:
Admin Phone:
Admin Phone Ext:
Admin Fax:
Admin Fax Ext:
Admin Email:
Registry Tech ID:
Tech Name:
Tech Organization:
Tech Street:
Tech City:
Tech State/Province:
Tech PostalCode:
Tech Country:
Tech Phone:
Tech Phone Ext:
Tech Fax:
Tech Fax Ext:
Tech Email:
Name Server:jm1.dns.com
Name Server:jm2.dns.com
DNSSEC:unsigned
URL of the ICANN WHOIS Data Problem Reporting System: http://wdprs.internic.net/
>>> Last update of WHOIS database: 2018-12-23T14:08:06.00Z <<<:

For more information on Whois status codes, please visit https://icann.org/epp

The Data in Paycenter's WHOIS database is provided by Paycenter
for information purposes, and to assist persons in obtaining
information about or related to a domain name registration record.
Paycenter does not guarantee its accuracy.  By submitting
a WHOIS query, you agree that you will use this Data only
for lawful purposes and that,
under no circumstances will you use this Data to:
(1) allow, enable, or otherwise support the transmission
of mass unsolicited, commercial advertising or solicitations
via e-mail (spam); or
(2) enable high volume, automated, electronic processes that
apply to Paycenter or its systems.
Paycenter reserves the right to modify these terms at any time.
By submitting this query, you agree to abide by this policy.!!
";

const REGISTRO_BR_REPLY: &str = "\
% Copyright (c) Nic.br
%  The use of the data below is only permitted as described in
%  full by the terms of use at https://registro.br/termo/en.html ,
%  being prohibited its distribution, commercialization or
%  reproduction, in particular, to use it for advertising or
%  any similar purpose.
%  2024-03-14T10:15:22-03:00 - IP: 203.0.113.7

domain:      likker.com.br
owner:       Likker Comercio de Bebidas LTDA
owner-id:    12.345.678/0001-90
responsible: Joao da Silva
country:     BR
owner-c:     JOSIL123
tech-c:      TECRE45
nserver:     ns1.likker.com.br
nsstat:      20240313 AA
nslastaa:    20240313
nserver:     ns2.likker.com.br
created:     20150922 #14567890
changed:     20230811
expires:     20250922
status:      published

nic-hdl-br:  JOSIL123
person:      Joao da Silva
created:     20100315
changed:     20220101
";

fn entries(raw: &str) -> Vec<(String, String)> {
    parse(raw)
        .unwrap()
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

fn pairs(expected: &[(&str, &str)]) -> Vec<(String, String)> {
    expected
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

#[test]
fn test_parse_markmonitor_reply() {
    let expected = pairs(&[
        ("domainName", "google.com"),
        ("registryDomainId", "2138514_DOMAIN_COM-VRSN"),
        ("registrarWhoisServer", "whois.markmonitor.com"),
        ("registrarUrl", "http://www.markmonitor.com"),
        ("updatedDate", "2015-06-12T10:38:52-0700"),
        ("creationDate", "1997-09-15T00:00:00-0700"),
        ("registrarRegistrationExpirationDate", "2020-09-13T21:00:00-0700"),
        ("registrar", "MarkMonitor, Inc."),
        ("registrarIanaId", "292"),
        ("registrarAbuseContactEmail", "abusecomplaints@markmonitor.com"),
        ("registrarAbuseContactPhone", "+1.2083895740"),
        (
            "domainStatus",
            "clientUpdateProhibited (https://www.icann.org/epp#clientUpdateProhibited) \
             clientTransferProhibited (https://www.icann.org/epp#clientTransferProhibited) \
             clientDeleteProhibited (https://www.icann.org/epp#clientDeleteProhibited) \
             serverUpdateProhibited (https://www.icann.org/epp#serverUpdateProhibited) \
             serverTransferProhibited (https://www.icann.org/epp#serverTransferProhibited) \
             serverDeleteProhibited (https://www.icann.org/epp#serverDeleteProhibited)",
        ),
        ("registrantName", "Dns Admin"),
        ("registrantOrganization", "Google Inc."),
        (
            "registrantStreet",
            "Please contact contact-admin@google.com, 1600 Amphitheatre Parkway",
        ),
        ("registrantCity", "Mountain View"),
        ("registrantStateProvince", "CA"),
        ("registrantPostalCode", "94043"),
        ("registrantCountry", "US"),
        ("registrantPhone", "+1.6502530000"),
        ("registrantFax", "+1.6506188571"),
        ("registrantEmail", "dns-admin@google.com"),
        ("adminName", "DNS Admin"),
        ("adminOrganization", "Google Inc."),
        ("adminStreet", "1600 Amphitheatre Parkway"),
        ("adminCity", "Mountain View"),
        ("adminStateProvince", "CA"),
        ("adminPostalCode", "94043"),
        ("adminCountry", "US"),
        ("adminPhone", "+1.6506234000"),
        ("adminFax", "+1.6506188571"),
        ("adminEmail", "dns-admin@google.com"),
        ("techName", "DNS Admin"),
        ("techOrganization", "Google Inc."),
        ("techStreet", "2400 E. Bayshore Pkwy"),
        ("techCity", "Mountain View"),
        ("techStateProvince", "CA"),
        ("techPostalCode", "94043"),
        ("techCountry", "US"),
        ("techPhone", "+1.6503300100"),
        ("techFax", "+1.6506181499"),
        ("techEmail", "dns-admin@google.com"),
        (
            "nameServer",
            "ns4.google.com ns2.google.com ns1.google.com ns3.google.com",
        ),
        ("dnssec", "unsigned"),
        (
            "urlOfTheIcannWhoisDataProblemReportingSystem",
            "http://wdprs.internic.net/",
        ),
        ("lastUpdateOfWhoisDatabase", "2017-02-22T03:53:14-0800"),
    ]);

    assert_eq!(entries(MARKMONITOR_REPLY), expected);
}

#[test]
fn test_parse_reply_without_spaces_after_delimiters() {
    let expected = pairs(&[
        ("domainName", "addlvr.com"),
        ("registryDomainId", "2323887016_DOMAIN_COM-VRSN"),
        ("registrarWhoisServer", "whois.paycenter.com.cn"),
        ("registrarUrl", "http://www.xinnet.com"),
        ("updatedDate", "2018-10-22T04:51:08.00Z"),
        ("creationDate", "2018-10-21T02:11:14.00Z"),
        ("registrarRegistrationExpirationDate", "2019-10-21T02:11:14.00Z"),
        ("registrar", "XINNET TECHNOLOGY CORPORATION"),
        ("registrarIanaId", "120"),
        ("registrarAbuseContactEmail", "supervision@xinnet.com"),
        ("registrarAbuseContactPhone", "+86.1087128064"),
        ("reseller", "hefeixunyunwangluokejiyouxiangongsi"),
        ("domainStatus", "ok https://www.icann.org/epp#ok"),
        ("nameServer", "jm1.dns.com jm2.dns.com"),
        ("dnssec", "unsigned"),
        (
            "urlOfTheIcannWhoisDataProblemReportingSystem",
            "http://wdprs.internic.net/",
        ),
        ("lastUpdateOfWhoisDatabase", "2018-12-23T14:08:06.00Z"),
    ]);

    assert_eq!(entries(XINNET_REPLY), expected);
}

#[test]
fn test_extract_markmonitor_summary() {
    let record = parse(MARKMONITOR_REPLY).unwrap();
    let summary = extract_record(&record, Some("google.com"));

    assert_eq!(summary.origin, "whois");
    assert_eq!(
        summary.domain_expiration_date,
        Some(Utc.with_ymd_and_hms(2020, 9, 14, 4, 0, 0).unwrap())
    );
    assert_eq!(summary.registrar.name.as_deref(), Some("MarkMonitor, Inc."));
    assert_eq!(
        summary.registrar.url.as_deref(),
        Some("http://www.markmonitor.com")
    );
    assert_eq!(summary.registrar.owner, None);
    assert_eq!(summary.registrar.tech, None);
    assert_eq!(summary.provider.as_deref(), Some("MarkMonitor, Inc."));
    assert_eq!(
        summary.name_servers,
        Some(vec![
            "ns4.google.com".to_string(),
            "ns2.google.com".to_string(),
            "ns1.google.com".to_string(),
            "ns3.google.com".to_string(),
        ])
    );
}

#[test]
fn test_extract_registro_br_defaults() {
    let record = parse(REGISTRO_BR_REPLY).unwrap();
    assert_eq!(record.get("domain"), Some("likker.com.br"));
    assert_eq!(
        record.get("nserver"),
        Some("ns1.likker.com.br ns2.likker.com.br")
    );

    let summary = extract_record(&record, None);
    assert_eq!(summary.registrar.name.as_deref(), Some("Registro BR"));
    assert_eq!(summary.registrar.url.as_deref(), Some("https://registro.br"));
    assert_eq!(summary.registrar.owner.as_deref(), Some("JOSIL123"));
    assert_eq!(summary.registrar.tech.as_deref(), Some("TECRE45"));
    assert_eq!(summary.provider.as_deref(), Some("Registro BR"));
    assert_eq!(
        summary.domain_expiration_date,
        Some(Utc.with_ymd_and_hms(2025, 9, 22, 0, 0, 0).unwrap())
    );
}

#[test]
fn test_summary_serializes_camel_case() {
    let record = parse(XINNET_REPLY).unwrap();
    let summary = extract_record(&record, Some("addlvr.com"));
    let json = serde_json::to_value(&summary).unwrap();

    assert_eq!(json["origin"], "whois");
    assert_eq!(json["domainExpirationDate"], "2019-10-21T02:11:14Z");
    assert_eq!(json["registrar"]["name"], "XINNET TECHNOLOGY CORPORATION");
    assert_eq!(json["nameServers"][1], "jm2.dns.com");
}

#[test]
fn test_extract_prefers_earlier_authority_for_exact_keys() {
    let registry = parse("Domain Name: GOOGLE.COM\nRegistrar: MarkMonitor Inc.\nRegistry Expiry Date: 2028-09-14T04:00:00Z\n").unwrap();
    let registrar = parse(MARKMONITOR_REPLY).unwrap();

    let authorities = vec![
        AuthorityRecord::new("whois.verisign-grs.com", registry),
        AuthorityRecord::new("whois.markmonitor.com", registrar),
    ];
    let summary = extract(&authorities, Some("google.com"));

    assert_eq!(summary.registrar.name.as_deref(), Some("MarkMonitor Inc."));
    assert_eq!(
        summary.domain_expiration_date,
        Some(Utc.with_ymd_and_hms(2028, 9, 14, 4, 0, 0).unwrap())
    );
    // URL only appears in the registrar's reply
    assert_eq!(
        summary.registrar.url.as_deref(),
        Some("http://www.markmonitor.com")
    );
}

#[test]
fn test_records_built_outside_the_parser() {
    let collected: ParsedRecord = pairs(&[
        ("domainName", "example.com"),
        ("nameServer", "a.iana-servers.net"),
        ("nameServer", "b.iana-servers.net"),
    ])
    .into_iter()
    .collect();
    assert_eq!(
        collected.get("nameServer"),
        Some("a.iana-servers.net b.iana-servers.net")
    );

    let json = serde_json::to_string(&collected).unwrap();
    let restored: ParsedRecord = serde_json::from_str(&json).unwrap();
    assert_eq!(restored, collected);
    assert_eq!(restored.keys().collect::<Vec<_>>(), vec!["domainName", "nameServer"]);
}

#[test]
fn test_sanitize_and_validation_exports() {
    assert_eq!(sanitize("  Google.COM ").unwrap(), "google.com");
    assert_eq!(sanitize("http://likker.com.br/path?q=1").unwrap(), "likker.com.br");
    assert_eq!(sanitize(""), Err(LookupError::NoDomain));
    assert!(matches!(
        sanitize("not a domain"),
        Err(LookupError::DomainParse { .. })
    ));

    assert!(is_fully_qualified_domain_name("example.co.uk"));
    assert!(!is_fully_qualified_domain_name("localhost"));
    assert!(!is_fully_qualified_domain_name("example.123"));
}

#[test]
fn test_error_messages() {
    assert_eq!(LookupError::NoDomain.to_string(), "You must enter a domain.");
    assert_eq!(
        LookupError::WhoisResponseEmpty.to_string(),
        "Whois request returned no value."
    );
    assert!(LookupError::whois_via(Strategy::Proxy, "refused")
        .to_string()
        .starts_with("PROXY: Error making Whois request."));
}

#[test]
fn test_directory_export() {
    let directory = ServerDirectory::new();
    let tlds = directory.known_tlds();
    assert!(tlds.contains(&"com".to_string()));
    assert!(tlds.contains(&"br".to_string()));
    assert_eq!(directory.resolve("example.unknowntld").host, "whois.verisign-grs.com");
}

/// Loopback WHOIS server that answers every connection with `reply`.
async fn loopback_server(reply: &'static str) -> ServerDescriptor {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            tokio::spawn(async move {
                let mut buf = [0u8; 256];
                let _ = socket.read(&mut buf).await;
                let _ = socket.write_all(reply.as_bytes()).await;
            });
        }
    });

    ServerDescriptor::new("127.0.0.1").with_port(port)
}

fn loopback_resolver() -> Resolver {
    let config = ResolverConfig::default()
        .with_connect_timeout(Duration::from_secs(2))
        .with_idle_timeout(Duration::from_millis(200))
        .with_deadline(Duration::from_secs(5));

    Resolver::with_parts(
        config,
        Arc::new(ServerDirectory::new()),
        Arc::new(ProxyList::empty()),
    )
}

#[tokio::test]
async fn test_resolver_against_loopback_server() {
    let server = loopback_server(
        "Domain Name:addlvr.com\r\nRegistrar:XINNET TECHNOLOGY CORPORATION\r\n\
         Reseller:hefeixunyunwangluokejiyouxiangongsi\r\n\
         Name Server:jm1.dns.com\r\nName Server:jm2.dns.com\r\n",
    )
    .await;
    let resolver = loopback_resolver();
    let options = ConnectionOptions::new().with_server(server);

    let resolution = resolver.resolve("addlvr.com", &options).await.unwrap();
    assert_eq!(resolution.strategy, Strategy::Default);
    assert_eq!(resolution.domain, "addlvr.com");
    assert_eq!(resolution.authorities.len(), 1);
    assert_eq!(
        resolution.record().unwrap().get("reseller"),
        Some("hefeixunyunwangluokejiyouxiangongsi")
    );

    let summary = resolver.lookup("addlvr.com", &options).await.unwrap();
    assert_eq!(
        summary.name_servers,
        Some(vec!["jm1.dns.com".to_string(), "jm2.dns.com".to_string()])
    );
}

#[tokio::test]
async fn test_resolver_alternative_only() {
    let server = loopback_server("Domain Name: example.com\r\nRegistrar: Example Registrar\r\n").await;
    let resolver = loopback_resolver();
    let options = ConnectionOptions::new()
        .with_server(server)
        .with_strategy(Strategy::Alternative);

    let record = resolver.query("example.com", &options).await.unwrap();
    assert_eq!(record.get("registrar"), Some("Example Registrar"));
}

#[tokio::test]
async fn test_proxy_strategy_without_proxies_fails() {
    let resolver = loopback_resolver();
    let options = ConnectionOptions::new()
        .with_server(ServerDescriptor::new("127.0.0.1").with_port(9))
        .with_strategy(Strategy::Proxy);

    let err = resolver.resolve("example.com", &options).await.unwrap_err();
    assert!(err.to_string().starts_with("PROXY: "));
}
