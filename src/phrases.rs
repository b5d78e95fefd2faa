// 🗣️ Phrase Detectors - Recognisable institutional wording
//
// One closed set of phrase families shared by the category mapper, the
// nature resolver and the pipeline's early drop checks. Each family is a
// single case-insensitive regex compiled once.

use regex::Regex;
use std::sync::OnceLock;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phrase {
    /// Future-dated debit notices
    Pending,
    /// Card-side acknowledgement that a bill payment arrived
    CardPaymentReceived,
    /// Bank-side debit paying a credit card bill
    CardBillPayment,
    StatementNotice,
    Refund,
    Interest,
    Cashback,
    RecurringDeposit,
    Investment,
    WalletLoad,
    Salary,
    /// Wording that names where incoming money came from
    IncomeSource,
    Otp,
    CollectRequest,
    Declined,
}

impl Phrase {
    pub const ALL: [Phrase; 15] = [
        Phrase::Pending,
        Phrase::CardPaymentReceived,
        Phrase::CardBillPayment,
        Phrase::StatementNotice,
        Phrase::Refund,
        Phrase::Interest,
        Phrase::Cashback,
        Phrase::RecurringDeposit,
        Phrase::Investment,
        Phrase::WalletLoad,
        Phrase::Salary,
        Phrase::IncomeSource,
        Phrase::Otp,
        Phrase::CollectRequest,
        Phrase::Declined,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Phrase::Pending => "pending",
            Phrase::CardPaymentReceived => "card-payment-received",
            Phrase::CardBillPayment => "card-bill-payment",
            Phrase::StatementNotice => "statement-notice",
            Phrase::Refund => "refund",
            Phrase::Interest => "interest",
            Phrase::Cashback => "cashback",
            Phrase::RecurringDeposit => "recurring-deposit",
            Phrase::Investment => "investment",
            Phrase::WalletLoad => "wallet-load",
            Phrase::Salary => "salary",
            Phrase::IncomeSource => "income-source",
            Phrase::Otp => "otp",
            Phrase::CollectRequest => "collect-request",
            Phrase::Declined => "declined",
        }
    }

    fn pattern(&self) -> &'static str {
        match self {
            Phrase::Pending => {
                r"(?i)\bwill be (?:auto[- ]?)?(?:debited|deducted|charged|processed)\b|\bscheduled (?:for|on)\b|\bupcoming (?:payment|debit|mandate|emi)\b|\bpre[- ]debit notification\b|\bauto[- ]?debit (?:on|scheduled)\b"
            }
            Phrase::CardPaymentReceived => {
                r"(?i)\bpayment (?:of [^.]{0,40})?(?:has been |is |was )?received\b[^.]{0,60}\bcard\b|\bthank you for (?:the |your )?(?:recent )?payment\b[^.]{0,60}\bcard\b|\bcard\b[^.]{0,60}\bthank you for (?:the |your )?(?:recent )?payment\b|\bcard (?:bill |dues? )?payment (?:has been |is )?(?:received|successful)\b|\breceived (?:a |your )?payment of\b[^.]{0,60}\bcard\b"
            }
            Phrase::CardBillPayment => {
                r"(?i)\b(?:paid|payment|transferred) (?:towards|to|for) (?:your )?(?:[a-z]+ )?(?:bank )?credit card\b|\bcredit card (?:bill|dues) (?:paid|payment)\b|\bcc bill (?:paid|payment)\b"
            }
            Phrase::StatementNotice => {
                r"(?i)\bstatement\b[^.]{0,80}\b(?:generated|ready|sent|emailed|total (?:amount )?due|amount due|amt due|min(?:imum)? (?:amount )?due)\b|\btotal (?:amount |amt )?due\b|\bmin(?:imum)? (?:amount |amt )?due\b|\bbill\b[^.]{0,40}\bis due\b|\bbill (?:is )?generated\b"
            }
            Phrase::Refund => {
                r"(?i)\brefund(?:ed)?\b|\breversal\b|\breversed\b|\breimburse(?:d|ment)?\b|\bcredited back\b"
            }
            Phrase::Interest => {
                r"(?i)\binterest (?:credited|paid|earned|amount|payout)\b|\bint\.? (?:credited|cr|pd)\b|\bsavings? (?:a/c )?interest\b|\binterest of\b|\bcredited (?:with |towards )?interest\b"
            }
            Phrase::Cashback => {
                r"(?i)\bcash ?back\b|\breward(?:s)? (?:credited|amount|redeemed)\b|\bscratch ?card\b|\bpoints? redeemed\b"
            }
            Phrase::RecurringDeposit => {
                r"(?i)\brecurring deposit\b|\bR\.?D\.? (?:installment|instalment|a/c|account)\b"
            }
            Phrase::Investment => {
                r"(?i)\bmutual funds?\b|\bSIP\b|\bNAV\b|\bunits? (?:allotted|purchased)\b|\bfolio\b|\bdemat\b|\bstocks?\b|\bshares\b|\bequity\b|\bNPS\b|\bPPF\b|\btrading (?:a/c|account)\b|\bbrokerage\b"
            }
            Phrase::WalletLoad => {
                r"(?i)\badded money\b|\badd money\b|\bloaded (?:to|in|into|on) (?:your )?(?:\w+ )?wallet\b|\bwallet (?:top[- ]?up|load(?:ed)?|recharge)\b|\bto (?:your )?\w+ wallet\b"
            }
            Phrase::Salary => r"(?i)\bsalary\b|\bsal (?:cr|credit)\b|\bpayroll\b",
            Phrase::IncomeSource => {
                r"(?i)\bsalary\b|\bfrom\b|\bNEFT\b|\bIMPS\b|\bRTGS\b|\bUPI\b|\brefund\b|\binterest\b|\bdividend\b|\bdeposit(?:ed)? by\b|\bpension\b"
            }
            Phrase::Otp => {
                r"(?i)\b(?:OTP|one[- ]time password)\b (?:is|for)\b|\bis (?:your|the) (?:OTP|one[- ]time password|verification code)\b|\buse OTP\b"
            }
            Phrase::CollectRequest => {
                r"(?i)\bhas requested (?:money|payment|rs\.?|inr|₹)|\bcollect request\b|\brequested (?:rs\.?|inr|₹)\s*[0-9]"
            }
            Phrase::Declined => {
                r"(?i)\bdeclined\b|\b(?:transaction|txn|payment) (?:has |was |is )?failed\b|\bfailed (?:transaction|txn)\b|\bunsuccessful\b|\binsufficient (?:funds|balance)\b"
            }
        }
    }

    fn regex(&self) -> &'static Regex {
        static RE: OnceLock<Vec<Regex>> = OnceLock::new();
        let compiled = RE.get_or_init(|| {
            Phrase::ALL
                .iter()
                .map(|p| Regex::new(p.pattern()).expect("invalid phrase pattern"))
                .collect()
        });
        &compiled[*self as usize]
    }

    /// The matched text, for trace entries
    pub fn find<'a>(&self, body: &'a str) -> Option<&'a str> {
        self.regex().find(body).map(|m| m.as_str())
    }

    pub fn matches(&self, body: &str) -> bool {
        self.regex().is_match(body)
    }
}

/// Notices that never describe a completed money movement
pub fn non_transactional(body: &str) -> Option<Phrase> {
    [Phrase::Otp, Phrase::CollectRequest]
        .into_iter()
        .find(|p| p.matches(body))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_patterns_compile_in_declared_order() {
        for (i, phrase) in Phrase::ALL.iter().enumerate() {
            assert_eq!(*phrase as usize, i);
            let _ = phrase.matches("");
        }
    }

    #[test]
    fn test_pending() {
        assert!(Phrase::Pending.matches("Rs 499 will be debited on 05-Apr for NETFLIX mandate"));
        assert!(!Phrase::Pending.matches("Rs 499 debited for NETFLIX"));
    }

    #[test]
    fn test_card_payment_received() {
        assert!(Phrase::CardPaymentReceived
            .matches("Payment of Rs 12,000 received towards your ICICI Bank Credit Card XX4321"));
        assert!(Phrase::CardPaymentReceived.matches("Thank you for the payment of INR 5000 on your card XX4321"));
        assert!(!Phrase::CardPaymentReceived.matches("Rs 500 received from RAJESH"));
    }

    #[test]
    fn test_thank_you_without_card_is_not_card_payment() {
        assert!(!Phrase::CardPaymentReceived
            .matches("Rs 599.00 debited from A/c XX1234 to AIRTEL POSTPAID via UPI. Thank you for your payment."));
        assert!(!Phrase::CardPaymentReceived.matches("Thank you for the payment of INR 5000"));
        // the card mention belongs to a different sentence
        assert!(!Phrase::CardPaymentReceived
            .matches("Thank you for your payment. Get 5% off with our card offers"));
    }

    #[test]
    fn test_card_bill_payment_from_bank_side() {
        assert!(Phrase::CardBillPayment.matches("Rs 12000 paid towards your HDFC credit card XX4321"));
        assert!(!Phrase::CardBillPayment.matches("Rs 12000 spent on credit card XX4321 at AMAZON"));
    }

    #[test]
    fn test_statement_notice() {
        assert!(Phrase::StatementNotice.matches("Statement for card XX12 generated. Total due Rs 4,200"));
        assert!(Phrase::StatementNotice.matches("Your Credit Card bill of Rs 5,000 is due on 15-Mar"));
        assert!(!Phrase::StatementNotice.matches("Rs 5000 debited from a/c XX12"));
    }

    #[test]
    fn test_income_kinds() {
        assert!(Phrase::Refund.matches("Refund of Rs 200 credited"));
        assert!(Phrase::Interest.matches("Interest credited Rs 312 to a/c XX12"));
        assert!(Phrase::Cashback.matches("Cashback of Rs 50 credited"));
        assert!(Phrase::Salary.matches("Rs 50000 credited; salary for March"));
        assert!(Phrase::IncomeSource.matches("Rs 50000 credited; salary for March"));
        assert!(!Phrase::IncomeSource.matches("Rs 90000 credited to a/c XX12"));
    }

    #[test]
    fn test_non_transactional() {
        assert_eq!(non_transactional("123456 is your OTP for txn of Rs 500"), Some(Phrase::Otp));
        assert_eq!(
            non_transactional("RAJESH has requested money Rs 200 via UPI"),
            Some(Phrase::CollectRequest)
        );
        assert_eq!(non_transactional("Rs 200 debited. Never share your OTP"), None);
    }

    #[test]
    fn test_find_returns_matched_text() {
        assert_eq!(Phrase::Declined.find("Txn of Rs 50 DECLINED"), Some("DECLINED"));
    }
}
