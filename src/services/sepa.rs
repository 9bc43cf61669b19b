// src/services/sepa.rs
//
// pain.001 credit transfer batch generation. One flat batch: a single
// PmtInf block with a uniform execution date, one CdtTrfTxInf per payment.
// All preconditions are enforced here at the function boundary; there is no
// UI upstream to filter out unpayable rows.

use crate::errors::{AppError, AppResult};
use crate::models::{BankAccount, PaymentKind};
use chrono::{DateTime, NaiveDate, Utc};
use quick_xml::Writer;
use quick_xml::events::{BytesDecl, BytesStart, BytesText, Event};
use rust_decimal::Decimal;
use uuid::Uuid;

const PAIN_001_NAMESPACE: &str = "urn:iso:std:iso:20022:tech:xsd:pain.001.001.03";

#[derive(Debug, Clone)]
pub struct SepaPayment {
    pub id: Uuid,
    pub kind: PaymentKind,
    pub beneficiary: String,
    pub iban: String,
    pub bic: Option<String>,
    pub amount: Decimal,
    pub reference: String,
    pub description: String,
}

#[derive(Debug)]
pub struct BuiltBatch {
    pub message_id: String,
    pub filename: String,
    pub payment_count: usize,
    pub total_amount: Decimal,
    pub xml: String,
}

/// Serialize a payment batch debiting `emitter`. Fails before any XML is
/// produced when the selection is empty or a payment lacks beneficiary
/// coordinates; once preconditions hold, generation itself cannot fail on
/// business grounds.
pub fn build_batch(
    emitter: &BankAccount,
    company_name: &str,
    payments: &[SepaPayment],
    execution_date: NaiveDate,
    created_at: DateTime<Utc>,
    message_id: &str,
) -> AppResult<BuiltBatch> {
    if payments.is_empty() {
        return Err(AppError::EmptyBatch);
    }
    for payment in payments {
        if payment.iban.trim().is_empty() {
            return Err(AppError::Validation(format!(
                "Missing IBAN for beneficiary '{}'",
                payment.beneficiary
            )));
        }
        match &payment.bic {
            Some(bic) if !bic.trim().is_empty() => {}
            _ => return Err(AppError::MissingBic(payment.beneficiary.clone())),
        }
        if payment.amount <= Decimal::ZERO {
            return Err(AppError::Validation(format!(
                "Payment '{}' has a non-positive amount",
                payment.reference
            )));
        }
    }

    let total_amount: Decimal = payments.iter().map(|p| p.amount).sum();
    let tx_count = payments.len().to_string();
    let control_sum = money(total_amount);

    let mut buf = Vec::new();
    let mut wr = Writer::new_with_indent(&mut buf, b' ', 2);

    wr.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))
        .map_err(xml_err)?;

    let mut document = BytesStart::new("Document");
    document.push_attribute(("xmlns", PAIN_001_NAMESPACE));
    wr.write_event(Event::Start(document)).map_err(xml_err)?;

    open(&mut wr, "CstmrCdtTrfInitn")?;

    // Group header
    open(&mut wr, "GrpHdr")?;
    leaf(&mut wr, "MsgId", message_id)?;
    leaf(
        &mut wr,
        "CreDtTm",
        &created_at.format("%Y-%m-%dT%H:%M:%S").to_string(),
    )?;
    leaf(&mut wr, "NbOfTxs", &tx_count)?;
    leaf(&mut wr, "CtrlSum", &control_sum)?;
    open(&mut wr, "InitgPty")?;
    leaf(&mut wr, "Nm", company_name)?;
    close(&mut wr, "InitgPty")?;
    close(&mut wr, "GrpHdr")?;

    // Payment information: one flat block, uniform execution date
    open(&mut wr, "PmtInf")?;
    leaf(&mut wr, "PmtInfId", &format!("{message_id}-01"))?;
    leaf(&mut wr, "PmtMtd", "TRF")?;
    leaf(&mut wr, "BtchBookg", "true")?;
    leaf(&mut wr, "NbOfTxs", &tx_count)?;
    leaf(&mut wr, "CtrlSum", &control_sum)?;
    open(&mut wr, "PmtTpInf")?;
    open(&mut wr, "SvcLvl")?;
    leaf(&mut wr, "Cd", "SEPA")?;
    close(&mut wr, "SvcLvl")?;
    close(&mut wr, "PmtTpInf")?;
    leaf(
        &mut wr,
        "ReqdExctnDt",
        &execution_date.format("%Y-%m-%d").to_string(),
    )?;
    open(&mut wr, "Dbtr")?;
    leaf(&mut wr, "Nm", &emitter.account_name)?;
    close(&mut wr, "Dbtr")?;
    open(&mut wr, "DbtrAcct")?;
    open(&mut wr, "Id")?;
    leaf(&mut wr, "IBAN", &emitter.iban)?;
    close(&mut wr, "Id")?;
    close(&mut wr, "DbtrAcct")?;
    open(&mut wr, "DbtrAgt")?;
    open(&mut wr, "FinInstnId")?;
    leaf(&mut wr, "BIC", &emitter.bic)?;
    close(&mut wr, "FinInstnId")?;
    close(&mut wr, "DbtrAgt")?;
    leaf(&mut wr, "ChrgBr", "SLEV")?;

    for payment in payments {
        write_transaction(&mut wr, payment)?;
    }

    close(&mut wr, "PmtInf")?;
    close(&mut wr, "CstmrCdtTrfInitn")?;
    close(&mut wr, "Document")?;

    let xml = String::from_utf8(buf)
        .map_err(|e| AppError::Internal(format!("Generated batch is not valid UTF-8: {e}")))?;

    Ok(BuiltBatch {
        message_id: message_id.to_string(),
        filename: format!("{message_id}.xml"),
        payment_count: payments.len(),
        total_amount,
        xml,
    })
}

fn write_transaction<W: std::io::Write>(
    wr: &mut Writer<W>,
    payment: &SepaPayment,
) -> AppResult<()> {
    open(wr, "CdtTrfTxInf")?;

    open(wr, "PmtId")?;
    leaf(wr, "EndToEndId", &payment.reference)?;
    close(wr, "PmtId")?;

    open(wr, "Amt")?;
    let mut amt = BytesStart::new("InstdAmt");
    amt.push_attribute(("Ccy", "EUR"));
    wr.write_event(Event::Start(amt)).map_err(xml_err)?;
    wr.write_event(Event::Text(BytesText::new(&money(payment.amount))))
        .map_err(xml_err)?;
    close(wr, "InstdAmt")?;
    close(wr, "Amt")?;

    // precondition guarantees Some
    if let Some(bic) = &payment.bic {
        open(wr, "CdtrAgt")?;
        open(wr, "FinInstnId")?;
        leaf(wr, "BIC", bic)?;
        close(wr, "FinInstnId")?;
        close(wr, "CdtrAgt")?;
    }

    open(wr, "Cdtr")?;
    leaf(wr, "Nm", &payment.beneficiary)?;
    close(wr, "Cdtr")?;

    open(wr, "CdtrAcct")?;
    open(wr, "Id")?;
    leaf(wr, "IBAN", &payment.iban)?;
    close(wr, "Id")?;
    close(wr, "CdtrAcct")?;

    if !payment.description.is_empty() {
        open(wr, "RmtInf")?;
        leaf(wr, "Ustrd", &payment.description)?;
        close(wr, "RmtInf")?;
    }

    close(wr, "CdtTrfTxInf")?;
    Ok(())
}

fn open<W: std::io::Write>(wr: &mut Writer<W>, name: &str) -> AppResult<()> {
    wr.write_event(Event::Start(BytesStart::new(name)))
        .map_err(xml_err)
}

fn close<W: std::io::Write>(wr: &mut Writer<W>, name: &str) -> AppResult<()> {
    wr.write_event(Event::End(BytesStart::new(name).to_end()))
        .map_err(xml_err)
}

fn leaf<W: std::io::Write>(wr: &mut Writer<W>, name: &str, value: &str) -> AppResult<()> {
    open(wr, name)?;
    wr.write_event(Event::Text(BytesText::new(value)))
        .map_err(xml_err)?;
    close(wr, name)
}

fn xml_err<E: std::fmt::Display>(e: E) -> AppError {
    AppError::Internal(format!("XML write failed: {e}"))
}

fn money(amount: Decimal) -> String {
    format!("{:.2}", amount)
}

/// Guard on the mark-pending step. The status flips are conditional on the
/// row still being payable, so a count short of the selection means another
/// batch claimed a payment between selection and commit; the caller must
/// roll back.
pub fn ensure_all_marked(expected: usize, updated: u64) -> AppResult<()> {
    if updated == expected as u64 {
        Ok(())
    } else {
        Err(AppError::Conflict(
            "One or more selected payments were already included in another batch".to_string(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn emitter() -> BankAccount {
        BankAccount {
            id: Uuid::new_v4(),
            company_id: Uuid::new_v4(),
            account_name: "Compte courant".to_string(),
            iban: "FR7630006000011234567890189".to_string(),
            bic: "AGRIFRPP".to_string(),
            created_at: Utc::now(),
        }
    }

    fn payment(beneficiary: &str, amount: Decimal, bic: Option<&str>) -> SepaPayment {
        SepaPayment {
            id: Uuid::new_v4(),
            kind: PaymentKind::SupplierInvoice,
            beneficiary: beneficiary.to_string(),
            iban: "DE89370400440532013000".to_string(),
            bic: bic.map(str::to_string),
            amount,
            reference: format!("REF-{beneficiary}"),
            description: format!("Facture {beneficiary}"),
        }
    }

    fn execution_date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 7, 15).unwrap()
    }

    #[test]
    fn batch_carries_control_sum_and_count() {
        let payments = [
            payment("Alpha SARL", dec!(1200.50), Some("DEUTDEFF")),
            payment("Beta SAS", dec!(499.50), Some("BNPAFRPP")),
        ];
        let built = build_batch(
            &emitter(),
            "Ma Société",
            &payments,
            execution_date(),
            Utc::now(),
            "SEPA-TEST-001",
        )
        .unwrap();

        assert_eq!(built.payment_count, 2);
        assert_eq!(built.total_amount, dec!(1700.00));
        assert!(built.xml.contains("<MsgId>SEPA-TEST-001</MsgId>"));
        assert!(built.xml.contains("<NbOfTxs>2</NbOfTxs>"));
        assert!(built.xml.contains("<CtrlSum>1700.00</CtrlSum>"));
        assert!(built.xml.contains("<ReqdExctnDt>2024-07-15</ReqdExctnDt>"));
        assert!(built.xml.contains("<EndToEndId>REF-Alpha SARL</EndToEndId>"));
        assert!(
            built
                .xml
                .contains("<InstdAmt Ccy=\"EUR\">1200.50</InstdAmt>")
        );
        assert!(
            built
                .xml
                .contains("<IBAN>FR7630006000011234567890189</IBAN>")
        );
        assert_eq!(built.filename, "SEPA-TEST-001.xml");
    }

    #[test]
    fn missing_bic_is_rejected() {
        let payments = [
            payment("Alpha SARL", dec!(100), Some("DEUTDEFF")),
            payment("Gamma SA", dec!(200), None),
        ];
        let err = build_batch(
            &emitter(),
            "Ma Société",
            &payments,
            execution_date(),
            Utc::now(),
            "SEPA-TEST-002",
        )
        .unwrap_err();

        assert!(matches!(err, AppError::MissingBic(name) if name == "Gamma SA"));
    }

    #[test]
    fn empty_selection_is_rejected() {
        let err = build_batch(
            &emitter(),
            "Ma Société",
            &[],
            execution_date(),
            Utc::now(),
            "SEPA-TEST-003",
        )
        .unwrap_err();
        assert!(matches!(err, AppError::EmptyBatch));
    }

    #[test]
    fn partial_mark_pending_is_a_conflict() {
        assert!(ensure_all_marked(2, 2).is_ok());
        assert!(ensure_all_marked(0, 0).is_ok());
        // a concurrent batch already flipped one of the rows
        assert!(matches!(
            ensure_all_marked(2, 1).unwrap_err(),
            AppError::Conflict(_)
        ));
        assert!(matches!(
            ensure_all_marked(1, 0).unwrap_err(),
            AppError::Conflict(_)
        ));
    }

    #[test]
    fn non_positive_amount_is_rejected() {
        let payments = [payment("Alpha SARL", dec!(0), Some("DEUTDEFF"))];
        let err = build_batch(
            &emitter(),
            "Ma Société",
            &payments,
            execution_date(),
            Utc::now(),
            "SEPA-TEST-004",
        )
        .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }
}
