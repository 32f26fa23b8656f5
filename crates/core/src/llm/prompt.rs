use crate::domain::decision::DecisionRequest;
use crate::llm::DecisionPrompt;

/// Render both conversation turns from a validated request. Pure and
/// deterministic: same input, same output, no I/O. Missing optional fields
/// are filled with their documented defaults, never rejected.
pub fn build(request: &DecisionRequest) -> DecisionPrompt {
    DecisionPrompt {
        system: system_instruction(),
        user: user_instruction(request),
    }
}

fn system_instruction() -> String {
    [
        "You are Pezo, a conservative and practical spending coach.",
        "",
        "You do NOT provide financial/investment advice.",
        "",
        "Decide only based on provided data.",
        "",
        "Output STRICT JSON ONLY. No markdown, no code blocks, just pure JSON.",
        "",
        "Response format:",
        "{",
        "  \"decision\": \"BUY\" | \"WAIT\" | \"NO\",",
        "  \"confidence\": 0-100,",
        "  \"reasoning\": [\"bullet point 1\", \"bullet point 2\", \"bullet point 3\"],",
        "  \"suggestion\": \"one short action sentence\"",
        "}",
        "",
        "Rules:",
        "- decision: \"BUY\" if affordable and reasonable, \"WAIT\" if uncertain or insufficient data, \"NO\" if clearly unaffordable",
        "- confidence: 0-100 integer",
        "- reasoning: exactly 3 bullet points (strings), max 100 chars each",
        "- suggestion: one short actionable sentence, max 80 chars",
        "- If insufficient data: decision = \"WAIT\", confidence <= 60",
    ]
    .join("\n")
}

fn user_instruction(request: &DecisionRequest) -> String {
    let snapshot = &request.snapshot;
    let currency = &request.currency;

    let category = request
        .category
        .as_deref()
        .filter(|c| !c.is_empty())
        .unwrap_or("Other");

    // BTreeMap keeps this rendering stable across calls.
    let category_totals = serde_json::to_string(&snapshot.category_totals)
        .unwrap_or_else(|_| "{}".to_string());

    let recurring_note = if request.is_recurring {
        let frequency = request
            .frequency
            .as_deref()
            .filter(|f| !f.is_empty())
            .unwrap_or("monthly");
        format!("Note: This is a recurring {frequency} expense.")
    } else {
        String::new()
    };

    format!(
        "Purchase decision needed:\n\n\
         Item: {item}\n\
         Price: {price} {currency}\n\
         Category: {category}\n\n\
         Financial snapshot:\n\
         - Current balance: {balance} {currency}\n\
         - Monthly income: {monthly_income} {currency}\n\
         - Average daily spending: {avg_daily_spending} {currency}\n\
         - Recurring expenses: {recurring_expenses} {currency}\n\
         - Days left in month: {days_left_in_month}\n\
         - Savings goal: {savings_goal} {currency}\n\
         - Last 30 day spend: {last_30_day_spend} {currency}\n\
         - Average monthly spend: {avg_monthly_spend} {currency}\n\
         - Category totals: {category_totals}\n\n\
         {recurring_note}\n\n\
         Provide your decision as JSON only.",
        item = request.item,
        price = request.price,
        balance = snapshot.balance,
        monthly_income = snapshot.monthly_income,
        avg_daily_spending = snapshot.avg_daily_spending,
        recurring_expenses = snapshot.recurring_expenses,
        days_left_in_month = snapshot.days_left_in_month,
        savings_goal = snapshot.savings_goal_display(),
        last_30_day_spend = snapshot.last_30_day_spend,
        avg_monthly_spend = snapshot.avg_monthly_spend,
    )
}
